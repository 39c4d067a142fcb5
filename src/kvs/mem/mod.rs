#![cfg(feature = "kv-mem")]

use std::collections::BTreeMap;

use parking_lot::RwLock;

use crate::err::{Error, Result};
use crate::kvs::{DatastoreMode, Key, MergeOperator, Val};

pub struct Datastore {
	/// The underlying ordered map
	inner: RwLock<BTreeMap<Key, Val>>,
	/// Whether this datastore was opened for reading only
	read_only: bool,
	/// The merge semantics applied by the merge operation
	merge: MergeOperator,
}

impl Datastore {
	/// Open a new database
	pub(super) fn new(mode: DatastoreMode, merge: MergeOperator) -> Datastore {
		Datastore {
			inner: RwLock::new(BTreeMap::new()),
			read_only: matches!(mode, DatastoreMode::ReadOnly),
			merge,
		}
	}

	/// Check if this datastore was opened for reading only
	pub(super) fn is_read_only(&self) -> bool {
		self.read_only
	}

	/// Validates that a write operation can be performed on this datastore
	fn ensure_write(&self) -> Result<()> {
		if self.read_only {
			return Err(Error::ReadOnlyViolation);
		}
		Ok(())
	}

	/// Fetch a key from the database
	#[instrument(level = "trace", target = "undokv::kvs::mem", skip_all, fields(key = %String::from_utf8_lossy(key)))]
	pub(super) fn get(&self, key: &[u8]) -> Result<Option<Val>> {
		// Get the key
		let res = self.inner.read().get(key).cloned();
		// Return result
		Ok(res)
	}

	/// Insert or update a key in the database
	#[instrument(level = "trace", target = "undokv::kvs::mem", skip_all, fields(key = %String::from_utf8_lossy(&key)))]
	pub(super) fn put(&self, key: Key, val: Val) -> Result<()> {
		// Check to see if this datastore is writeable
		self.ensure_write()?;
		// Set the key
		self.inner.write().insert(key, val);
		// Return result
		Ok(())
	}

	/// Delete a key from the database
	#[instrument(level = "trace", target = "undokv::kvs::mem", skip_all, fields(key = %String::from_utf8_lossy(key)))]
	pub(super) fn del(&self, key: &[u8]) -> Result<()> {
		// Check to see if this datastore is writeable
		self.ensure_write()?;
		// Remove the key
		self.inner.write().remove(key);
		// Return result
		Ok(())
	}

	/// Merge a value into a key, applying the registered merge operator
	#[instrument(level = "trace", target = "undokv::kvs::mem", skip_all, fields(key = %String::from_utf8_lossy(&key)))]
	pub(super) fn merge(&self, key: Key, val: Val) -> Result<()> {
		// Check to see if this datastore is writeable
		self.ensure_write()?;
		// Load the inner map
		let mut inner = self.inner.write();
		// Apply the merge operator to the existing value
		let merged = (self.merge)(&key, inner.get(&key).map(|v| v.as_slice()), &val);
		// Set the key
		inner.insert(key, merged);
		// Return result
		Ok(())
	}

	/// Shutdown the database
	pub(super) fn shutdown(&self) {
		// Nothing to do here
	}
}
