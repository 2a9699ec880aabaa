use std::num::ParseIntError;
use std::path::PathBuf;

/// Errors surfaced to the caller of a [`super::Decoder`].
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("malformed input `{input}`: {source}")]
    MalformedInput {
        input: String,
        #[source]
        source: ParseIntError,
    },
    #[error("container id not found for pid {pid} in `{path}`")]
    ContainerIdNotFound { pid: u32, path: PathBuf },
    #[error(transparent)]
    Container(#[from] crate::container::Error),
    #[error("no decoder registered under name `{0}`")]
    UnknownDecoder(String),
}

pub type Result<T> = std::result::Result<T, Error>;
