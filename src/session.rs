use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use crossbeam_channel::Receiver;
use parking_lot::RwLock;

use crate::annotate;
use crate::camera::{SourceProvider, VideoSource};
use crate::detection::{Detection, Detector, DetectorLoader, Mode};
use crate::error::SessionError;
use crate::frame::Frame;
use crate::persister::{AlertPersister, AlertRecord};
use crate::ring_buffer::FrameRingBuffer;
use crate::state::{SessionState, SessionStateMachine, SessionStatus, TransitionError};
use crate::trigger::DebounceTrigger;

/// Per-tick payload for the UI layer.
#[derive(Debug, Clone)]
pub struct FrameUpdate {
    /// Frame with detection overlays drawn
    pub frame: Frame,
    pub detections: Vec<Detection>,
    /// True on the tick an alert fired
    pub triggered: bool,
}

/// The front-end collaborator. Implementations must tolerate being called
/// from the session loop thread and should return quickly; heavy rendering
/// belongs on the far side of a channel.
pub trait EventSink: Send + Sync {
    /// Published once per tick.
    fn frame_update(&self, update: FrameUpdate);

    /// An alert fired this tick; `detections` are the triggering frame's.
    fn alert_fired(&self, detections: &[Detection]);

    /// A persistence worker finished (successfully or not).
    fn alert_saved(&self, record: &AlertRecord) {
        let _ = record;
    }

    /// The loop exited; `reason` is human-readable.
    fn session_stopped(&self, reason: &str) {
        let _ = reason;
    }
}

/// Engine knobs for one session.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    pub mode: Mode,
    /// Assumed capture rate; also the clip encode rate and the loop pace
    pub fps: f64,
    /// Seconds of history retained for alert clips
    pub buffer_seconds: f64,
    /// Consecutive hit frames required to fire
    pub trigger_frames: u32,
    /// Minimum spacing between alerts; zero reproduces the legacy
    /// fire-every-window behavior
    pub min_alert_interval: Duration,
    pub alerts_dir: PathBuf,
}

impl SessionConfig {
    pub fn new(mode: Mode) -> Self {
        Self {
            mode,
            fps: 15.0,
            buffer_seconds: 5.0,
            trigger_frames: 3,
            min_alert_interval: Duration::ZERO,
            alerts_dir: PathBuf::from("alerts"),
        }
    }
}

#[derive(Default)]
struct SessionCounters {
    frames: AtomicU64,
    alerts_fired: AtomicU64,
    alerts_failed: AtomicU64,
}

/// Orchestrates one camera's capture → detect → trigger → persist loop.
///
/// `start()` loads the mode's detectors and opens the source; either
/// failure leaves the session STOPPED. While running, a dedicated loop
/// thread processes one frame per paced tick — frame N+1 is never touched
/// before frame N is done, and nothing queues behind a slow detector.
/// `stop()` is cooperative: the flag is observed at the top of the next
/// tick, the loop thread is joined, in-flight persistence is drained, and
/// the camera is released exactly once (on the loop thread, by drop).
pub struct DetectionSession {
    config: SessionConfig,
    provider: Arc<dyn SourceProvider>,
    loader: Arc<dyn DetectorLoader>,
    sink: Arc<dyn EventSink>,
    state: Arc<RwLock<SessionStateMachine>>,
    counters: Arc<SessionCounters>,
    stop_flag: Arc<AtomicBool>,
    persister: Arc<AlertPersister>,
    records_rx: Receiver<AlertRecord>,
    loop_handle: Option<JoinHandle<()>>,
}

impl DetectionSession {
    pub fn new(
        config: SessionConfig,
        provider: Arc<dyn SourceProvider>,
        loader: Arc<dyn DetectorLoader>,
        sink: Arc<dyn EventSink>,
    ) -> Self {
        let (persister, records_rx) = AlertPersister::new(
            config.alerts_dir.clone(),
            config.mode.alert_prefix(),
            config.fps,
        );

        Self {
            config,
            provider,
            loader,
            sink,
            state: Arc::new(RwLock::new(SessionStateMachine::new())),
            counters: Arc::new(SessionCounters::default()),
            stop_flag: Arc::new(AtomicBool::new(false)),
            persister: Arc::new(persister),
            records_rx,
            loop_handle: None,
        }
    }

    /// Load detectors, open the source, and spawn the tick loop.
    ///
    /// On any failure the session stays STOPPED and the error is returned;
    /// a model-load failure never reaches the source-open step.
    pub fn start(&mut self) -> Result<(), SessionError> {
        self.state.write().start().map_err(|e| match e {
            TransitionError::AlreadyRunning | TransitionError::InTransition => {
                SessionError::AlreadyRunning
            }
            TransitionError::AlreadyStopped => SessionError::NotRunning,
        })?;

        let options = self.config.mode.options();
        let mut detectors: Vec<(Option<String>, Box<dyn Detector>)> = Vec::new();
        for spec in self.config.mode.models() {
            match self.loader.load(&spec.model_ref, &options) {
                Ok(detector) => {
                    tracing::info!(model = %spec.model_ref, detector = detector.name(), "detector loaded");
                    detectors.push((spec.label_prefix.clone(), detector));
                }
                Err(e) => {
                    tracing::error!(model = %spec.model_ref, error = %e, "detector load failed");
                    self.state.write().force_stop();
                    return Err(e.into());
                }
            }
        }

        let source = match self.provider.open() {
            Ok(source) => source,
            Err(e) => {
                tracing::error!(error = %e, "video source unavailable");
                self.state.write().force_stop();
                return Err(e.into());
            }
        };

        self.stop_flag.store(false, Ordering::SeqCst);
        self.counters.frames.store(0, Ordering::Relaxed);
        self.counters.alerts_fired.store(0, Ordering::Relaxed);
        self.counters.alerts_failed.store(0, Ordering::Relaxed);

        let ctx = LoopContext {
            config: self.config.clone(),
            source,
            detectors,
            sink: Arc::clone(&self.sink),
            persister: Arc::clone(&self.persister),
            records_rx: self.records_rx.clone(),
            counters: Arc::clone(&self.counters),
            stop_flag: Arc::clone(&self.stop_flag),
            state: Arc::clone(&self.state),
        };

        let handle = thread::Builder::new()
            .name("detection-session".to_string())
            .spawn(move || run_loop(ctx))
            .map_err(|e| {
                self.state.write().force_stop();
                SessionError::ThreadSpawnFailed(e)
            })?;

        self.loop_handle = Some(handle);
        // The spawn can only fail above, so Starting → Running here.
        let _ = self.state.write().mark_running();
        tracing::info!("detection session running");
        Ok(())
    }

    /// Request a cooperative stop, join the loop, and drain persistence.
    pub fn stop(&mut self) -> Result<(), SessionError> {
        let handle = self.loop_handle.take().ok_or(SessionError::NotRunning)?;

        // The loop may already have exited on its own (end of stream); the
        // transition is then a no-op and we still join and drain.
        let _ = self.state.write().stop();
        self.stop_flag.store(true, Ordering::SeqCst);
        let _ = handle.join();

        self.persister.drain();
        while let Ok(record) = self.records_rx.try_recv() {
            if !record.success {
                self.counters.alerts_failed.fetch_add(1, Ordering::Relaxed);
            }
            self.sink.alert_saved(&record);
        }

        let mut state = self.state.write();
        if !state.state().is_stopped() {
            let _ = state.mark_stopped();
        }
        tracing::info!("detection session stopped");
        Ok(())
    }

    pub fn is_running(&self) -> bool {
        self.state.read().state().is_running()
    }

    /// Snapshot of the session for the UI layer. Read-only; only the
    /// session mutates the underlying state.
    pub fn status(&self) -> SessionStatus {
        SessionStatus {
            state: self.state.read().state(),
            frames_processed: self.counters.frames.load(Ordering::Relaxed),
            alerts_fired: self.counters.alerts_fired.load(Ordering::Relaxed),
            alerts_failed: self.counters.alerts_failed.load(Ordering::Relaxed),
        }
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }
}

impl Drop for DetectionSession {
    fn drop(&mut self) {
        if self.loop_handle.is_some() {
            let _ = self.stop();
        }
    }
}

struct LoopContext {
    config: SessionConfig,
    source: Box<dyn VideoSource>,
    detectors: Vec<(Option<String>, Box<dyn Detector>)>,
    sink: Arc<dyn EventSink>,
    persister: Arc<AlertPersister>,
    records_rx: Receiver<AlertRecord>,
    counters: Arc<SessionCounters>,
    stop_flag: Arc<AtomicBool>,
    state: Arc<RwLock<SessionStateMachine>>,
}

fn run_loop(mut ctx: LoopContext) {
    let mut ring = FrameRingBuffer::for_window(ctx.config.buffer_seconds, ctx.config.fps);
    let mut trigger = DebounceTrigger::new(ctx.config.trigger_frames)
        .with_min_interval(ctx.config.min_alert_interval);
    let frame_budget = Duration::from_secs_f64(1.0 / ctx.config.fps.max(0.1));

    tracing::info!(
        buffer_frames = ring.capacity(),
        trigger_frames = ctx.config.trigger_frames,
        "session loop started"
    );

    let reason = loop {
        if ctx.stop_flag.load(Ordering::SeqCst) {
            break "stop requested";
        }
        let tick_started = Instant::now();

        let frame = match ctx.source.read() {
            Ok(Some(frame)) => frame,
            Ok(None) => {
                tracing::info!("video source reached end of stream");
                break "end of stream";
            }
            Err(e) => {
                // One bad read stops the session rather than spinning on a
                // dead device.
                tracing::error!(error = %e, "frame read failed");
                break "read failure";
            }
        };

        ring.push(frame.clone());

        let mut detections: Vec<Detection> = Vec::new();
        for (prefix, detector) in ctx.detectors.iter_mut() {
            match detector.infer(&frame) {
                Ok(found) => match prefix {
                    Some(prefix) => {
                        detections.extend(found.into_iter().map(|d| d.with_label_prefix(prefix)))
                    }
                    None => detections.extend(found),
                },
                Err(e) => {
                    // Inference trouble only affects this tick's hit signal.
                    tracing::warn!(detector = detector.name(), error = %e, "inference failed");
                }
            }
        }

        let hit = ctx.config.mode.is_hit(&detections);
        let fired = trigger.observe(hit);

        let annotated = match annotate::draw_detections(&frame, &detections) {
            Ok(annotated) => annotated,
            Err(e) => {
                tracing::warn!(error = %e, "overlay drawing failed, publishing raw frame");
                frame.clone()
            }
        };

        if fired {
            let labels: Vec<&str> = detections.iter().map(|d| d.label.as_str()).collect();
            tracing::warn!(?labels, "alert triggered");
            ctx.counters.alerts_fired.fetch_add(1, Ordering::Relaxed);
            ctx.sink.alert_fired(&detections);
            // Copy-on-handoff: the snapshot is taken here on the loop
            // thread, so the encoder never sees a later push.
            ctx.persister
                .submit(ring.snapshot(), frame.clone(), detections.clone());
        }

        ctx.sink.frame_update(FrameUpdate {
            frame: annotated,
            detections,
            triggered: fired,
        });

        let frames = ctx.counters.frames.fetch_add(1, Ordering::Relaxed) + 1;
        if frames % 100 == 0 {
            tracing::debug!(
                frames,
                alerts = ctx.counters.alerts_fired.load(Ordering::Relaxed),
                in_flight = ctx.persister.in_flight(),
                "session heartbeat"
            );
        }

        while let Ok(record) = ctx.records_rx.try_recv() {
            if !record.success {
                ctx.counters.alerts_failed.fetch_add(1, Ordering::Relaxed);
            }
            ctx.sink.alert_saved(&record);
        }

        let elapsed = tick_started.elapsed();
        if elapsed < frame_budget {
            thread::sleep(frame_budget - elapsed);
        }
    };

    // Release the camera before telling anyone we are done.
    drop(ctx.source);
    tracing::info!(reason, "session loop exited");
    ctx.sink.session_stopped(reason);

    let mut state = ctx.state.write();
    match state.state() {
        SessionState::Stopping => {
            let _ = state.mark_stopped();
        }
        _ => state.force_stop(),
    }
}
