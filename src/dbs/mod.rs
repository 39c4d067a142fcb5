//! The database coordinator.
//!
//! A [`Database`] owns a set of indexes and a handle to the external
//! ordered key/value store. Level operations fan out to every contained
//! index in order, so that all indexes progress through revisions in
//! lockstep, and a database-level [`Session`] spans one child session per
//! index.

use crate::err::{Error, Result};
use crate::idx::{self, Index};
use crate::kvs::{self, DatastoreFlavor, MergeOperator, Val};

pub use crate::kvs::DatastoreMode;

const TARGET: &str = "undokv::dbs";

/// A set of indexes kept at a common revision, over an external store.
pub struct Database {
	/// The external ordered key/value store
	flavor: DatastoreFlavor,
	/// The managed indexes, all kept at a common revision
	indexes: Vec<Index>,
}

impl Database {
	/// Open a database at the given path, with the default merge semantics
	/// (the operand replaces the existing value).
	///
	/// The path `memory` selects the in-memory storage engine; a
	/// `rocksdb://` prefixed path or a bare directory path selects the
	/// RocksDB engine.
	pub fn new(path: &str, mode: DatastoreMode) -> Result<Database> {
		Database::new_with_merge(path, mode, kvs::overwrite_merge)
	}

	/// Open a database at the given path, registering the supplied merge
	/// operator with the store.
	pub fn new_with_merge(path: &str, mode: DatastoreMode, merge: MergeOperator) -> Result<Database> {
		Ok(Database {
			flavor: DatastoreFlavor::new(path, mode, merge)?,
			indexes: Vec::new(),
		})
	}

	/// Check if this database was opened for reading only.
	pub fn is_read_only(&self) -> bool {
		self.flavor.is_read_only()
	}

	/// Register an index with this database.
	///
	/// When other indexes are already registered, the revision range of the
	/// added index must match theirs. A freshly created index with no undo
	/// stack is aligned automatically: its revision is moved to the shared
	/// `begin`, then empty levels are pushed until it reaches the shared
	/// `end`. Any other mismatch fails with [`Error::CorruptedState`].
	pub fn add_index(&mut self, index: Index) -> Result<()> {
		// Ensure the undo stack of the added index is consistent with the
		// other indexes in the database
		if let Some(first) = self.indexes.first() {
			let expected = first.undo_stack_revision_range();
			let added = index.undo_stack_revision_range();
			if added != expected {
				if !index.undo_stack_is_empty() {
					return Err(Error::CorruptedState(format!(
						"index has an undo stack (revision range [{}, {}]) that is inconsistent with other indexes in the database (revision range [{}, {}])",
						added.0, added.1, expected.0, expected.1,
					)));
				}
				// Align the added index with the shared revision range
				debug!(target: TARGET, begin = expected.0, end = expected.1, "Aligning added index");
				index.set_revision(expected.0 as u64)?;
				while index.revision() < expected.1 {
					index.start_undo_session(true).push();
				}
			}
		}
		self.indexes.push(index);
		Ok(())
	}

	/// The indexes registered with this database, in registration order.
	pub fn indexes(&self) -> &[Index] {
		&self.indexes
	}

	/// Open a new undo session spanning every index in this database.
	///
	/// If not enabled, the returned session is inert and performs no
	/// action on drop.
	pub fn start_undo_session(&self, enabled: bool) -> Session {
		if !enabled {
			return Session::default();
		}
		// Open one child session per index
		let sessions = self.indexes.iter().map(|i| i.start_undo_session(true)).collect();
		Session::new(sessions)
	}

	/// The common revision of the contained indexes, or -1 when the
	/// database holds no indexes.
	pub fn revision(&self) -> i64 {
		match self.indexes.first() {
			Some(index) => index.revision(),
			None => -1,
		}
	}

	/// Set the revision clock of every contained index.
	pub fn set_revision(&self, revision: u64) -> Result<()> {
		for index in &self.indexes {
			index.set_revision(revision)?;
		}
		Ok(())
	}

	/// The shared revision range of the contained indexes, or `(-1, -1)`
	/// when the database holds no indexes.
	pub fn undo_stack_revision_range(&self) -> (i64, i64) {
		match self.indexes.first() {
			Some(index) => index.undo_stack_revision_range(),
			None => (-1, -1),
		}
	}

	/// Revert the top level of every contained index.
	pub fn undo(&self) {
		for index in &self.indexes {
			index.undo();
		}
	}

	/// Collapse the top level of every contained index into the level
	/// beneath it.
	pub fn squash(&self) {
		for index in &self.indexes {
			index.squash();
		}
	}

	/// Irrevocably drop, in every contained index, the levels with a
	/// revision at or below the given revision.
	pub fn commit(&self, revision: i64) {
		for index in &self.indexes {
			index.commit(revision);
		}
	}

	/// Revert every level of every contained index.
	pub fn undo_all(&self) {
		for index in &self.indexes {
			index.undo_all();
		}
	}

	/// Fetch the value stored under an id.
	#[instrument(level = "trace", target = "undokv::dbs", skip(self))]
	pub fn get(&self, id: u64) -> Result<Val> {
		match self.flavor.get(&kvs::key(id))? {
			Some(val) => Ok(val),
			None => Err(Error::NotFound(id)),
		}
	}

	/// Store a value under an id.
	#[instrument(level = "trace", target = "undokv::dbs", skip(self, val))]
	pub fn put(&self, id: u64, val: Val) -> Result<()> {
		self.flavor.put(kvs::key(id), val)
	}

	/// Delete the value stored under an id.
	#[instrument(level = "trace", target = "undokv::dbs", skip(self))]
	pub fn del(&self, id: u64) -> Result<()> {
		self.flavor.del(&kvs::key(id))
	}

	/// Merge a value into an id, applying the registered merge operator.
	#[instrument(level = "trace", target = "undokv::dbs", skip(self, val))]
	pub fn merge(&self, id: u64, val: Val) -> Result<()> {
		self.flavor.merge(kvs::key(id), val)
	}

	/// Shutdown the external store. Teardown failures are reported but
	/// never propagated.
	pub fn shutdown(&self) {
		info!(target: TARGET, "Shutting down {} kvs store", self.flavor);
		self.flavor.shutdown();
	}
}

/// A composite session spanning every index in a [`Database`].
///
/// Actions fan out to every child session in index order, after which the
/// child list is cleared, so the first action wins and subsequent actions
/// and the eventual drop are no-ops. Dropping an unactioned session
/// reverts the level on every index.
pub struct Session {
	/// One child session per index, cleared once actioned
	sessions: Vec<idx::Session>,
	/// The common revision captured when the sessions were opened
	revision: i64,
}

impl Session {
	fn new(sessions: Vec<idx::Session>) -> Self {
		let revision = match sessions.first() {
			Some(session) => session.revision(),
			None => -1,
		};
		Session {
			sessions,
			revision,
		}
	}

	/// Leave the level on the undo stack of every index when this session
	/// goes out of scope.
	pub fn push(&mut self) {
		for mut session in self.sessions.drain(..) {
			session.push();
		}
	}

	/// Collapse this level into the previous level on every index.
	pub fn squash(&mut self) {
		for mut session in self.sessions.drain(..) {
			session.squash();
		}
	}

	/// Revert this level on every index.
	pub fn undo(&mut self) {
		for mut session in self.sessions.drain(..) {
			session.undo();
		}
	}

	/// The revision captured when this session was opened, or -1 for an
	/// inert session.
	pub fn revision(&self) -> i64 {
		self.revision
	}
}

impl Default for Session {
	fn default() -> Self {
		Session {
			sessions: Vec::new(),
			revision: -1,
		}
	}
}

impl Drop for Session {
	fn drop(&mut self) {
		self.undo();
	}
}

#[cfg(test)]
mod tests;
