use std::io;
use std::path::PathBuf;

use thiserror::Error;

use crate::kernel::Kernel;

/// Everything that can abort a count. Every variant is fatal to the call
/// that produced it: the running total is dropped, never returned.
#[derive(Debug, Error)]
pub enum CountError {
    /// The input path does not exist.
    #[error("{}: No such file or directory", .path.display())]
    NotFound { path: PathBuf },

    /// The input exists but could not be opened (permissions, directory, ...).
    #[error("{}: {}", .path.display(), super::io_error_msg(.source))]
    Open {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// A read failed part way through the stream.
    #[error("read error: {}", super::io_error_msg(.0))]
    Io(#[from] io::Error),

    /// Block size is zero or not a multiple of the kernel's unit width.
    #[error("block size {block_size} is not a positive multiple of {unit} bytes")]
    Configuration { block_size: usize, unit: usize },

    /// A kernel was requested explicitly but the CPU cannot execute it.
    #[error("kernel '{kernel}' is not supported by this CPU")]
    Unsupported { kernel: Kernel },
}

impl CountError {
    /// Classify a failed `open()` of `path`.
    pub fn from_open(path: impl Into<PathBuf>, source: io::Error) -> Self {
        let path = path.into();
        if source.kind() == io::ErrorKind::NotFound {
            CountError::NotFound { path }
        } else {
            CountError::Open { path, source }
        }
    }
}
