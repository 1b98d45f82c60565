use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{SystemTime, UNIX_EPOCH};

use crossbeam_channel::{unbounded, Receiver, Sender};
use opencv::core::Size;
use opencv::prelude::*;
use opencv::videoio::VideoWriter;
use parking_lot::Mutex;

use crate::camera::frame_to_bgr_mat;
use crate::detection::Detection;
use crate::error::PersistError;
use crate::frame::Frame;

/// Durable record of one fired alert.
///
/// Immutable once produced. On a successful record every listed path exists
/// and is fully flushed; a failed record may list no paths at all. Partial
/// artifacts are never reported successful.
#[derive(Debug, Clone)]
pub struct AlertRecord {
    /// Timestamp-derived unique id; also the artifact file stem
    pub id: String,
    /// Encoded clip of the buffered window; `None` when the buffer was empty
    /// or persistence failed before the clip was flushed
    pub clip_path: Option<PathBuf>,
    /// Still of the triggering frame
    pub snapshot_path: Option<PathBuf>,
    /// Detections present on the triggering frame
    pub detections: Vec<Detection>,
    pub fired_at: SystemTime,
    pub success: bool,
    pub error: Option<String>,
}

struct PersistJob {
    frames: Vec<Frame>,
    last_frame: Frame,
    detections: Vec<Detection>,
    fired_at: SystemTime,
}

/// Writes alert artifacts off the live loop.
///
/// Each submitted alert runs as its own named worker thread; workers for
/// close-together alerts overlap freely because every alert owns a unique
/// file stem, claimed against both the filesystem and the other in-flight
/// workers. Completed records flow back over a channel, and `drain` joins
/// whatever is still encoding (called at session stop, so no worker
/// outlives the engine as a daemon).
pub struct AlertPersister {
    dir: PathBuf,
    prefix: String,
    fps: f64,
    claimed: Arc<Mutex<HashSet<String>>>,
    in_flight: Mutex<Vec<JoinHandle<()>>>,
    records_tx: Sender<AlertRecord>,
}

impl AlertPersister {
    /// Create a persister writing under `dir` with the mode's artifact
    /// prefix. Returns the receiving side for completed records.
    pub fn new(
        dir: impl Into<PathBuf>,
        prefix: impl Into<String>,
        fps: f64,
    ) -> (Self, Receiver<AlertRecord>) {
        let (records_tx, records_rx) = unbounded();
        (
            Self {
                dir: dir.into(),
                prefix: prefix.into(),
                fps,
                claimed: Arc::new(Mutex::new(HashSet::new())),
                in_flight: Mutex::new(Vec::new()),
                records_tx,
            },
            records_rx,
        )
    }

    /// Hand an alert off for persistence. Never blocks on the encoding and
    /// never panics; failures come back as a failed [`AlertRecord`].
    pub fn submit(&self, frames: Vec<Frame>, last_frame: Frame, detections: Vec<Detection>) {
        let job = PersistJob {
            frames,
            last_frame,
            detections,
            fired_at: SystemTime::now(),
        };

        let dir = self.dir.clone();
        let prefix = self.prefix.clone();
        let fps = self.fps;
        let claimed = Arc::clone(&self.claimed);
        let records_tx = self.records_tx.clone();

        let spawned = thread::Builder::new()
            .name("alert-persist".to_string())
            .spawn(move || {
                let record = persist_alert(&dir, &prefix, fps, &claimed, job);
                if record.success {
                    tracing::info!(
                        id = %record.id,
                        clip = ?record.clip_path,
                        snapshot = ?record.snapshot_path,
                        "alert persisted"
                    );
                } else {
                    tracing::warn!(
                        id = %record.id,
                        error = record.error.as_deref().unwrap_or("unknown"),
                        "alert persistence failed"
                    );
                }
                let _ = records_tx.send(record);
            });

        match spawned {
            Ok(handle) => {
                let mut in_flight = self.in_flight.lock();
                in_flight.retain(|h| !h.is_finished());
                in_flight.push(handle);
            }
            Err(e) => {
                tracing::error!(error = %e, "failed to spawn persistence worker");
                let _ = self.records_tx.send(AlertRecord {
                    id: String::new(),
                    clip_path: None,
                    snapshot_path: None,
                    detections: Vec::new(),
                    fired_at: SystemTime::now(),
                    success: false,
                    error: Some(format!("worker spawn failed: {}", e)),
                });
            }
        }
    }

    /// Join every in-flight worker.
    pub fn drain(&self) {
        let handles: Vec<_> = self.in_flight.lock().drain(..).collect();
        for handle in handles {
            let _ = handle.join();
        }
    }

    /// Number of persistence workers still running.
    pub fn in_flight(&self) -> usize {
        let mut in_flight = self.in_flight.lock();
        in_flight.retain(|h| !h.is_finished());
        in_flight.len()
    }
}

fn persist_alert(
    dir: &Path,
    prefix: &str,
    fps: f64,
    claimed: &Mutex<HashSet<String>>,
    job: PersistJob,
) -> AlertRecord {
    let mut record = AlertRecord {
        id: String::new(),
        clip_path: None,
        snapshot_path: None,
        detections: job.detections,
        fired_at: job.fired_at,
        success: false,
        error: None,
    };

    if let Err(e) = fs::create_dir_all(dir) {
        record.error = Some(
            PersistError::DirectoryCreationFailed {
                path: dir.display().to_string(),
                source: e,
            }
            .to_string(),
        );
        return record;
    }

    let id = match claim_id(dir, prefix, claimed, job.fired_at) {
        Ok(id) => id,
        Err(e) => {
            record.error = Some(e.to_string());
            return record;
        }
    };
    record.id = id.clone();

    let result = write_artifacts(dir, &id, fps, &job.frames, &job.last_frame, &mut record);
    claimed.lock().remove(&id);

    match result {
        Ok(()) => {
            record.success = true;
        }
        Err(e) => {
            // Remove anything partial so a failed record never points at
            // artifacts and a half-written clip is not mistaken for a real one.
            if let Some(clip) = record.clip_path.take() {
                let _ = fs::remove_file(clip);
            }
            if let Some(snapshot) = record.snapshot_path.take() {
                let _ = fs::remove_file(snapshot);
            }
            record.error = Some(e.to_string());
        }
    }
    record
}

/// Allocate a unique artifact stem `{prefix}_{unix_ts}` for this alert,
/// suffixing `_{n}` when a second alert lands in the same second. The stem
/// is checked against disk and against other in-flight workers.
fn claim_id(
    dir: &Path,
    prefix: &str,
    claimed: &Mutex<HashSet<String>>,
    fired_at: SystemTime,
) -> Result<String, PersistError> {
    let ts = fired_at
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0);

    let mut claimed = claimed.lock();
    for attempt in 0..100 {
        let stem = if attempt == 0 {
            format!("{}_{}", prefix, ts)
        } else {
            format!("{}_{}_{}", prefix, ts, attempt)
        };

        let on_disk = dir.join(format!("{}.mp4", stem)).exists()
            || dir.join(format!("{}.jpg", stem)).exists();
        if !on_disk && claimed.insert(stem.clone()) {
            return Ok(stem);
        }
    }

    Err(PersistError::IdExhausted {
        prefix: prefix.to_string(),
    })
}

/// Write clip then snapshot, in that order; the clip is fully released
/// before the snapshot starts, so success implies a flushed clip.
fn write_artifacts(
    dir: &Path,
    id: &str,
    fps: f64,
    frames: &[Frame],
    last_frame: &Frame,
    record: &mut AlertRecord,
) -> Result<(), PersistError> {
    if !frames.is_empty() {
        let clip_path = dir.join(format!("{}.mp4", id));
        write_clip(&clip_path, fps, frames)?;
        record.clip_path = Some(clip_path);
    }

    let snapshot_path = dir.join(format!("{}.jpg", id));
    write_snapshot(&snapshot_path, last_frame)?;
    record.snapshot_path = Some(snapshot_path);
    Ok(())
}

fn write_clip(path: &Path, fps: f64, frames: &[Frame]) -> Result<(), PersistError> {
    let clip_err = |e: Box<dyn std::error::Error + Send + Sync>| PersistError::ClipEncodeFailed {
        path: path.display().to_string(),
        source: e,
    };

    let (width, height) = (frames[0].width(), frames[0].height());
    let fourcc = VideoWriter::fourcc('m', 'p', '4', 'v').map_err(|e| clip_err(Box::new(e)))?;
    let mut writer = VideoWriter::new(
        &path.to_string_lossy(),
        fourcc,
        fps,
        Size::new(width as i32, height as i32),
        true,
    )
    .map_err(|e| clip_err(Box::new(e)))?;

    if !writer.is_opened().map_err(|e| clip_err(Box::new(e)))? {
        return Err(clip_err("video writer did not open".into()));
    }

    for frame in frames {
        if frame.width() != width || frame.height() != height {
            tracing::warn!(
                expected = format!("{}x{}", width, height),
                got = format!("{}x{}", frame.width(), frame.height()),
                "skipping clip frame with mismatched dimensions"
            );
            continue;
        }
        let mat = frame_to_bgr_mat(frame).map_err(|e| clip_err(Box::new(e)))?;
        writer.write(&mat).map_err(|e| clip_err(Box::new(e)))?;
    }

    writer.release().map_err(|e| clip_err(Box::new(e)))?;
    Ok(())
}

fn write_snapshot(path: &Path, frame: &Frame) -> Result<(), PersistError> {
    let snapshot_err =
        |e: Box<dyn std::error::Error + Send + Sync>| PersistError::SnapshotFailed {
            path: path.display().to_string(),
            source: e,
        };

    let img = image::RgbImage::from_raw(frame.width(), frame.height(), frame.rgb8().to_vec())
        .ok_or_else(|| snapshot_err("frame buffer does not match dimensions".into()))?;
    img.save(path).map_err(|e| snapshot_err(Box::new(e)))?;
    Ok(())
}
