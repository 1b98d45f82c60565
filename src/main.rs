use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use anyhow::Context;

use aegis::session::{EventSink, FrameUpdate};
use aegis::{
    AlertRecord, AppResult, CameraProvider, Config, Detection, DetectionSession,
    MotionDetectorLoader,
};

/// Initialize tracing with file rotation
///
/// Logs go to a `logs/` directory next to the executable (daily rotation)
/// and to the console.
fn initialize_tracing() {
    use tracing_appender::rolling;
    use tracing_subscriber::{fmt, prelude::*, EnvFilter};

    let log_dir = std::env::current_exe()
        .ok()
        .and_then(|exe| exe.parent().map(|dir| dir.join("logs")))
        .unwrap_or_else(|| std::path::PathBuf::from("logs"));

    if let Err(e) = std::fs::create_dir_all(&log_dir) {
        eprintln!("Warning: Failed to create log directory: {}", e);
    }

    let file_appender = rolling::daily(&log_dir, "aegis.log");

    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new("info"))
        .unwrap_or_else(|_| EnvFilter::new("warn"));

    let file_layer = fmt::layer()
        .with_writer(file_appender)
        .with_ansi(false)
        .with_target(true)
        .with_line_number(true);

    let console_layer = fmt::layer()
        .with_writer(std::io::stdout)
        .with_ansi(true)
        .with_target(false);

    tracing_subscriber::registry()
        .with(filter)
        .with(file_layer)
        .with(console_layer)
        .init();

    tracing::info!("Log directory: {}", log_dir.display());
}

/// Console front-end: logs per-tick detections and alert banners.
struct LogSink;

impl EventSink for LogSink {
    fn frame_update(&self, update: FrameUpdate) {
        if !update.detections.is_empty() {
            let summary: Vec<String> = update
                .detections
                .iter()
                .map(|d| format!("{} ({:.2})", d.label, d.confidence))
                .collect();
            tracing::debug!(detections = %summary.join(", "), "frame");
        }
    }

    fn alert_fired(&self, detections: &[Detection]) {
        let labels: Vec<&str> = detections.iter().map(|d| d.label.as_str()).collect();
        tracing::warn!(?labels, "ALERT: threat persisted, saving clip and snapshot");
    }

    fn alert_saved(&self, record: &AlertRecord) {
        if record.success {
            tracing::info!(
                id = %record.id,
                clip = ?record.clip_path,
                snapshot = ?record.snapshot_path,
                "alert saved"
            );
        } else {
            tracing::warn!(
                id = %record.id,
                error = record.error.as_deref().unwrap_or("unknown"),
                "alert could not be saved"
            );
        }
    }

    fn session_stopped(&self, reason: &str) {
        tracing::info!(reason, "session stopped");
    }
}

fn main() -> AppResult<()> {
    initialize_tracing();
    tracing::info!(
        "Starting Aegis v{} on {}",
        env!("CARGO_PKG_VERSION"),
        std::env::consts::ARCH
    );

    let config = Config::load()?;
    tracing::info!(
        mode = %config.mode,
        camera = config.camera_index,
        buffer_seconds = config.buffer_seconds,
        fps = config.fps,
        trigger_frames = config.trigger_frames,
        "configuration"
    );

    // The shipped binary wires the built-in motion detector; model-backed
    // deployments plug in their own DetectorLoader.
    let mut session = DetectionSession::new(
        config.session_config(),
        Arc::new(CameraProvider {
            index: config.camera_index,
        }),
        Arc::new(MotionDetectorLoader::default()),
        Arc::new(LogSink),
    );

    session.start().context("starting detection session")?;

    let shutdown = Arc::new(AtomicBool::new(false));
    let flag = Arc::clone(&shutdown);
    ctrlc::set_handler(move || {
        flag.store(true, Ordering::SeqCst);
    })
    .context("installing Ctrl-C handler")?;

    tracing::info!("monitoring; press Ctrl+C to stop");
    while !shutdown.load(Ordering::SeqCst) && session.is_running() {
        thread::sleep(Duration::from_millis(250));
    }

    let status = session.status();
    session.stop().context("stopping detection session")?;
    tracing::info!(
        frames = status.frames_processed,
        alerts = status.alerts_fired,
        failed = status.alerts_failed,
        "session finished"
    );
    Ok(())
}
