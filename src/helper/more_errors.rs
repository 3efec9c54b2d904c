use std::io;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum IoError {
    #[error("failed to create directory {0}")]
    CreateDirectoryFailed(String, #[source] io::Error),
    #[error("failed to serialize save state")]
    SerializeFailed(#[source] bincode::Error),
    #[error("failed to deserialize save state")]
    DeserializeFailed(#[source] bincode::Error),
    #[error("failed to write file {0}")]
    WriteFileFailed(String, #[source] io::Error),
    #[error("file not found: {0}")]
    FileNotFound(String),
    #[error("failed to read file {0}")]
    ReadFileFailed(String, #[source] io::Error),
    #[error("{path} is not a save state of this version (header = {found:02x?})")]
    InvalidPrecursor { path: String, found: Vec<u8> },
}

impl IoError {
    pub fn read_file_error(io_error: io::Error, file_path: String) -> Self {
        if io_error.kind() == io::ErrorKind::NotFound {
            Self::FileNotFound(file_path)
        } else {
            Self::ReadFileFailed(file_path, io_error)
        }
    }

    /// True for errors that just mean nothing was saved yet
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::FileNotFound(_))
    }
}
