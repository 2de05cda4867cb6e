use redraft_core::{FileId, SurfaceError};

#[derive(Debug, thiserror::Error)]
pub enum PatchError {
    /// The target file is not open in the editor surface.
    #[error("no open document for {0}")]
    NoDocument(FileId),
    /// The editor surface rejected a line edit.
    #[error(transparent)]
    Surface(#[from] SurfaceError),
    #[error("failed to persist {file}: {source}")]
    Persist {
        file: FileId,
        #[source]
        source: SurfaceError,
    },
}
