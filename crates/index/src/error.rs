use thiserror::Error;

/// Errors raised while reading an index file.
///
/// A missing file is not an error; the parser reports it as
/// [`crate::ParsedIndex::Absent`].
#[derive(Error, Debug)]
pub enum IndexError {
	#[error("IO error: {0}")]
	Io(#[from] std::io::Error),
}
