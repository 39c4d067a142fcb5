use thiserror::Error;

/// Result type for all undokv operations
pub type Result<T> = std::result::Result<T, Error>;

/// An error surfaced to callers of the index, database, or adapter layer.
///
/// Invariant violations detected mid-mutation are not represented here:
/// those denote a broken engine state and abort the process instead.
#[derive(Error, Debug)]
pub enum Error {
	/// The requested record or key does not exist
	#[error("record not found: {0}")]
	NotFound(u64),

	/// A record could not be inserted without violating uniqueness
	#[error("could not insert record, most likely a uniqueness constraint was violated")]
	UniquenessViolation,

	/// The revision cannot be changed while levels remain on the undo stack
	#[error("cannot set revision while there is an existing undo stack")]
	InvalidState,

	/// The requested revision does not fit the signed revision clock
	#[error("the revision to set is too high")]
	OutOfRange,

	/// A write operation was attempted on a read-only datastore
	#[error("cannot write to a read-only datastore")]
	ReadOnlyViolation,

	/// The revision ranges of the indexes in a database disagree
	#[error("corrupted database: {0}")]
	CorruptedState(String),

	/// There was a problem with the underlying datastore
	#[error("there was a problem with the datastore: {0}")]
	Datastore(String),
}

#[cfg(feature = "kv-rocksdb")]
impl From<rocksdb::Error> for Error {
	fn from(e: rocksdb::Error) -> Error {
		Error::Datastore(e.to_string())
	}
}
