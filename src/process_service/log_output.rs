//! Driver log output
//!
//! Where the merged stdout/stderr of the driver process ends up

use std::{
    fs::File,
    io,
    path::Path,
    process::Stdio,
};

/// Log output sink
///
/// Both stdout and stderr of the driver are wired to the same sink
#[derive(Debug, Default)]
pub enum LogOutput {
    /// Discard everything the driver prints
    #[default]
    Null,

    /// Share the stdout/stderr of the current process
    Inherit,

    /// Write into an already opened file
    File(File),
}

impl LogOutput {
    /// Create (or truncate) the file at `path` and use it as the sink
    pub fn open(path: impl AsRef<Path>) -> io::Result<Self> {
        File::create(path).map(Self::File)
    }

    /// The underlying file, if the output goes to one
    pub fn as_file(&self) -> Option<&File> {
        match self {
            Self::File(file) => Some(file),
            Self::Null | Self::Inherit => None,
        }
    }

    /// Build a `Stdio` for one of the child's streams
    ///
    /// Files are cloned so each stream holds its own handle on the same description
    pub fn stdio(&self) -> io::Result<Stdio> {
        match self {
            Self::Null => Ok(Stdio::null()),
            Self::Inherit => Ok(Stdio::inherit()),
            Self::File(file) => file.try_clone().map(Stdio::from),
        }
    }
}

impl From<File> for LogOutput {
    fn from(file: File) -> Self {
        Self::File(file)
    }
}
