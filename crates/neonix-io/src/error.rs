use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum IoError {
    #[error("{0} is open read-only")]
    ReadOnly(PathBuf),

    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("store error: {0}")]
    Store(#[from] neonix_store::StoreError),

    #[error("sync error: {0}")]
    Sync(#[from] neonix_sync::SyncError),
}

pub type IoResult<T> = Result<T, IoError>;
