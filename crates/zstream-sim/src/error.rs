use thiserror::Error;
use zstream_core::DetectorError;

#[derive(Debug, Error)]
pub enum SimError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Detector(#[from] DetectorError),

    #[error("invalid stream configuration: {0}")]
    Stream(String),
}
