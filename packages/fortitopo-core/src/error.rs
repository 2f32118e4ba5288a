use std::path::PathBuf;

/// Fatal errors from rendering or writing a topology document.
#[derive(Debug, thiserror::Error)]
pub enum TopologyError {
    #[error("failed to encode diagram XML: {0}")]
    Xml(String),

    #[error("failed to write {}: {source}", .path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

pub type Result<T> = std::result::Result<T, TopologyError>;
