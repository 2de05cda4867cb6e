use std::io;
use std::path::PathBuf;

use redraft_core::SurfaceError;
use redraft_session::PatchError;

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("cannot read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error(transparent)]
    Patch(#[from] PatchError),
    #[error(transparent)]
    Surface(#[from] SurfaceError),
    #[error(transparent)]
    Io(#[from] io::Error),
    #[error("serializing output: {0}")]
    Json(#[from] serde_json::Error),
}
