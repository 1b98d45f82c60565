use thiserror::Error;

/// Application-level errors using thiserror for structured error handling.
///
/// Each enum covers one failure domain of the pipeline. Failures that only
/// affect an alert's side work (persistence) are isolated by the session;
/// failures that affect frame production stop it.

#[derive(Error, Debug)]
pub enum SourceError {
    #[error("Cannot open video source {index}")]
    Unavailable {
        index: i32,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    #[error("Failed to read frame from video source")]
    ReadFailed(#[source] Box<dyn std::error::Error + Send + Sync>),

    #[error("Video source produced an unusable frame: {0}")]
    BadFrame(String),
}

#[derive(Error, Debug)]
pub enum DetectorError {
    #[error("Failed to load detector model: {model}")]
    LoadFailed {
        model: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    #[error("Inference failed")]
    InferenceFailed(#[source] Box<dyn std::error::Error + Send + Sync>),
}

#[derive(Error, Debug)]
pub enum PersistError {
    #[error("Failed to create alert directory: {path}")]
    DirectoryCreationFailed {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to encode alert clip: {path}")]
    ClipEncodeFailed {
        path: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    #[error("Failed to write alert snapshot: {path}")]
    SnapshotFailed {
        path: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    #[error("Could not allocate a unique alert id for prefix {prefix}")]
    IdExhausted { prefix: String },
}

#[derive(Error, Debug)]
pub enum SessionError {
    #[error("Session is already running")]
    AlreadyRunning,

    #[error("Session is not running")]
    NotRunning,

    #[error("Failed to spawn session loop thread")]
    ThreadSpawnFailed(#[source] std::io::Error),

    #[error(transparent)]
    Source(#[from] SourceError),

    #[error(transparent)]
    Detector(#[from] DetectorError),
}

/// Type alias for application Results using anyhow for context chaining
pub type AppResult<T> = anyhow::Result<T>;
