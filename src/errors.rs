use std::fmt;

#[derive(Debug)]
pub enum BfsError {
    /// No file with this name exists
    NotFound(String),
    /// File name rejected by the directory
    InvalidName(String),
    /// No free inode or directory slot
    NoSpace(String),
    /// Open-file table is full
    TooManyOpenFiles(usize),
    /// Handle does not refer to a live open-file-table entry
    BadHandle(u32),
    /// Cursor would become negative or is otherwise unusable
    BadCursor(i64),
    /// Unrecognized seek mode
    BadWhence(i32),
    /// Block allocation failed or the file cannot grow further
    Alloc(String),
    /// Disk image missing
    NoDisk(String),
    /// On-disk structures failed validation
    Corrupt(String),
    /// Configuration error
    Config(String),
    /// Logging error
    Log(String),
    /// Serialization error
    Serialization(String),
    /// I/O error
    Io(std::io::Error),
}

impl BfsError {
    /// Whether this error means the store or the caller's state can no longer
    /// be trusted. The host decides what to do about it; the library never
    /// terminates the process.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            BfsError::BadHandle(_)
                | BfsError::BadCursor(_)
                | BfsError::BadWhence(_)
                | BfsError::Alloc(_)
                | BfsError::NoDisk(_)
                | BfsError::Corrupt(_)
                | BfsError::Io(_)
        )
    }
}

impl fmt::Display for BfsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BfsError::NotFound(name) => write!(f, "File not found: {name}"),
            BfsError::InvalidName(msg) => write!(f, "Invalid file name: {msg}"),
            BfsError::NoSpace(msg) => write!(f, "No space: {msg}"),
            BfsError::TooManyOpenFiles(max) => {
                write!(f, "Too many open files: table holds {max} entries")
            }
            BfsError::BadHandle(fd) => write!(f, "Bad file descriptor: {fd}"),
            BfsError::BadCursor(pos) => write!(f, "Bad cursor position: {pos}"),
            BfsError::BadWhence(whence) => write!(f, "Bad seek mode: {whence}"),
            BfsError::Alloc(msg) => write!(f, "Allocation error: {msg}"),
            BfsError::NoDisk(path) => write!(f, "Disk not found: {path}"),
            BfsError::Corrupt(msg) => write!(f, "Corrupt disk: {msg}"),
            BfsError::Config(msg) => write!(f, "Configuration error: {msg}"),
            BfsError::Log(msg) => write!(f, "Logging error: {msg}"),
            BfsError::Serialization(msg) => write!(f, "Serialization error: {msg}"),
            BfsError::Io(err) => write!(f, "I/O error: {err}"),
        }
    }
}

impl std::error::Error for BfsError {}

impl From<std::io::Error> for BfsError {
    fn from(err: std::io::Error) -> Self {
        BfsError::Io(err)
    }
}

impl From<serde_json::Error> for BfsError {
    fn from(err: serde_json::Error) -> Self {
        BfsError::Serialization(err.to_string())
    }
}

impl From<std::string::FromUtf8Error> for BfsError {
    fn from(err: std::string::FromUtf8Error) -> Self {
        BfsError::Corrupt(format!("UTF-8 conversion error: {err}"))
    }
}

impl PartialEq for BfsError {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (BfsError::NotFound(a), BfsError::NotFound(b)) => a == b,
            (BfsError::InvalidName(a), BfsError::InvalidName(b)) => a == b,
            (BfsError::NoSpace(a), BfsError::NoSpace(b)) => a == b,
            (BfsError::TooManyOpenFiles(a), BfsError::TooManyOpenFiles(b)) => a == b,
            (BfsError::BadHandle(a), BfsError::BadHandle(b)) => a == b,
            (BfsError::BadCursor(a), BfsError::BadCursor(b)) => a == b,
            (BfsError::BadWhence(a), BfsError::BadWhence(b)) => a == b,
            (BfsError::Alloc(a), BfsError::Alloc(b)) => a == b,
            (BfsError::NoDisk(a), BfsError::NoDisk(b)) => a == b,
            (BfsError::Corrupt(a), BfsError::Corrupt(b)) => a == b,
            (BfsError::Config(a), BfsError::Config(b)) => a == b,
            (BfsError::Log(a), BfsError::Log(b)) => a == b,
            (BfsError::Serialization(a), BfsError::Serialization(b)) => a == b,
            // std::io::Error has no PartialEq, compare messages
            (BfsError::Io(a), BfsError::Io(b)) => a.to_string() == b.to_string(),
            _ => false,
        }
    }
}

pub type BfsResult<T> = Result<T, BfsError>;
