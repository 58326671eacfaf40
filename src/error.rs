use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConsoleError {
    #[error("A network error occurred while talking to the simulation backend: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON deserialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Backend rejected {endpoint} with HTTP status {status}")]
    BackendStatus { endpoint: &'static str, status: u16 },

    #[error("Floorplan is unusable: {0}")]
    InvalidWorld(String),

    #[error("Snapshot payload is unusable: {0}")]
    InvalidPayload(String),

    #[error("Sync loop has stopped")]
    SyncStopped,
}
