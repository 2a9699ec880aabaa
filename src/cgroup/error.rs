use std::path::PathBuf;

/// Errors raised while rebuilding or searching the cgroup id to path mapping.
///
/// None of these reach the caller of [`crate::decoder::Decoder::decode`]; the
/// resolver logs them and degrades to whatever the cache holds.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("failed to walk cgroup tree at `{path}`: {source}")]
    Walk {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to resolve handle of `{path}`: {source}")]
    Handle {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("point search for cgroup id {id} failed: {source}")]
    Search {
        id: u64,
        #[source]
        source: std::io::Error,
    },
    #[error("unexpected point search output for cgroup id {id}: `{output}`")]
    UnexpectedSearchOutput { id: u64, output: String },
    #[error("cgroup refresh aborted after discovering {discovered} directories: {source}")]
    RefreshFailed {
        discovered: usize,
        #[source]
        source: Box<Error>,
    },
}

pub type Result<T> = std::result::Result<T, Error>;
