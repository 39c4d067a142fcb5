//! The module defining the key value store adapter.
//!
//! The database coordinator reaches the external ordered store through the
//! operations defined here:
//! - get
//! - put
//! - del
//! - merge
//!
//! These operations can be processed by the following storage engines:
//! - `rocksdb`: [RocksDB](https://github.com/facebook/rocksdb) an embeddable
//!   persistent key-value store for fast storage
//! - `mem`: in-memory database

mod mem;
mod rocksdb;

use std::fmt::{self, Display};

use crate::err::{Error, Result};

const TARGET: &str = "undokv::kvs";

/// The key part of a key-value pair. An alias for [`Vec<u8>`].
pub type Key = Vec<u8>;

/// The value part of a key-value pair. An alias for [`Vec<u8>`].
pub type Val = Vec<u8>;

/// The semantics applied by the `merge` operation.
///
/// Called with the key being merged, the existing value if any, and the
/// supplied operand; returns the merged value. The operator is registered
/// with the store when the datastore is opened.
pub type MergeOperator = fn(key: &[u8], existing: Option<&[u8]>, operand: &[u8]) -> Vec<u8>;

/// The default merge semantics: the operand replaces the existing value.
pub fn overwrite_merge(_key: &[u8], _existing: Option<&[u8]>, operand: &[u8]) -> Vec<u8> {
	operand.to_vec()
}

/// Whether a datastore is opened for reading only, or for reading and writing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DatastoreMode {
	ReadOnly,
	ReadWrite,
}

/// Converts a record id into its persisted key, the decimal ASCII of the id.
pub(crate) fn key(id: u64) -> Key {
	id.to_string().into_bytes()
}

/// The enabled storage engines which can process adapter operations.
#[allow(dead_code, reason = "Not all variants are used when not all storage backends are enabled.")]
pub enum DatastoreFlavor {
	#[cfg(feature = "kv-mem")]
	Mem(mem::Datastore),
	#[cfg(feature = "kv-rocksdb")]
	RocksDB(rocksdb::Datastore),
}

impl DatastoreFlavor {
	/// Initiate the desired datastore from a path string.
	///
	/// The path `memory` selects the in-memory engine; a `rocksdb:` or
	/// `rocksdb://` prefixed path, or a bare directory path, selects the
	/// RocksDB engine.
	#[allow(unused_variables, reason = "Some arguments are unused when no storage backends are enabled.")]
	pub fn new(path: &str, mode: DatastoreMode, merge: MergeOperator) -> Result<Self> {
		// Determine the desired storage engine
		let (flavor, path) = match path.split_once("://").or_else(|| path.split_once(':')) {
			None if path == "memory" => ("memory", ""),
			Some((flavor, path)) => (flavor, path),
			None => ("rocksdb", path),
		};
		// Initiate the desired datastore
		match flavor {
			// Initiate an in-memory datastore
			"memory" => {
				#[cfg(feature = "kv-mem")]
				{
					info!(target: TARGET, "Starting kvs store in memory");
					Ok(Self::Mem(mem::Datastore::new(mode, merge)))
				}
				#[cfg(not(feature = "kv-mem"))]
				Err(Error::Datastore("Cannot connect to the `memory` storage engine as it is not enabled in this build".to_owned()))
			}
			// Initiate a RocksDB datastore
			"rocksdb" | "file" => {
				#[cfg(feature = "kv-rocksdb")]
				{
					info!(target: TARGET, "Starting kvs store at {path}");
					rocksdb::Datastore::new(path, mode, merge).map(Self::RocksDB)
				}
				#[cfg(not(feature = "kv-rocksdb"))]
				Err(Error::Datastore("Cannot connect to the `rocksdb` storage engine as it is not enabled in this build".to_owned()))
			}
			// The datastore path is not valid
			_ => Err(Error::Datastore(format!("Unable to load the specified datastore {flavor}"))),
		}
	}

	/// Check if this datastore was opened for reading only.
	pub fn is_read_only(&self) -> bool {
		#[allow(unreachable_patterns)]
		match self {
			#[cfg(feature = "kv-mem")]
			Self::Mem(v) => v.is_read_only(),
			#[cfg(feature = "kv-rocksdb")]
			Self::RocksDB(v) => v.is_read_only(),
			_ => unreachable!(),
		}
	}

	/// Fetch a key from the datastore.
	pub fn get(&self, key: &[u8]) -> Result<Option<Val>> {
		#[allow(unreachable_patterns)]
		match self {
			#[cfg(feature = "kv-mem")]
			Self::Mem(v) => v.get(key),
			#[cfg(feature = "kv-rocksdb")]
			Self::RocksDB(v) => v.get(key),
			_ => unreachable!(),
		}
	}

	/// Insert or update a key in the datastore.
	pub fn put(&self, key: Key, val: Val) -> Result<()> {
		#[allow(unreachable_patterns)]
		match self {
			#[cfg(feature = "kv-mem")]
			Self::Mem(v) => v.put(key, val),
			#[cfg(feature = "kv-rocksdb")]
			Self::RocksDB(v) => v.put(key, val),
			_ => unreachable!(),
		}
	}

	/// Delete a key from the datastore.
	pub fn del(&self, key: &[u8]) -> Result<()> {
		#[allow(unreachable_patterns)]
		match self {
			#[cfg(feature = "kv-mem")]
			Self::Mem(v) => v.del(key),
			#[cfg(feature = "kv-rocksdb")]
			Self::RocksDB(v) => v.del(key),
			_ => unreachable!(),
		}
	}

	/// Merge a value into a key, applying the registered merge operator.
	pub fn merge(&self, key: Key, val: Val) -> Result<()> {
		#[allow(unreachable_patterns)]
		match self {
			#[cfg(feature = "kv-mem")]
			Self::Mem(v) => v.merge(key, val),
			#[cfg(feature = "kv-rocksdb")]
			Self::RocksDB(v) => v.merge(key, val),
			_ => unreachable!(),
		}
	}

	/// Shutdown the datastore.
	///
	/// Teardown failures are reported but never propagated.
	pub fn shutdown(&self) {
		#[allow(unreachable_patterns)]
		match self {
			#[cfg(feature = "kv-mem")]
			Self::Mem(v) => v.shutdown(),
			#[cfg(feature = "kv-rocksdb")]
			Self::RocksDB(v) => v.shutdown(),
			_ => unreachable!(),
		}
	}
}

impl Display for DatastoreFlavor {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		#![allow(unused_variables)]
		#[allow(unreachable_patterns)]
		match self {
			#[cfg(feature = "kv-mem")]
			Self::Mem(_) => write!(f, "memory"),
			#[cfg(feature = "kv-rocksdb")]
			Self::RocksDB(_) => write!(f, "rocksdb"),
			_ => unreachable!(),
		}
	}
}
