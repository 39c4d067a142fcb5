//! The versioned index overlay.
//!
//! An [`Index`] is an ordered collection of records keyed by a monotone
//! 64-bit identifier, together with a stack of undo states. Mutating
//! operations update the live collection and record their pre-images in
//! the top undo state; level operations manipulate the stack itself.
//!
//! Opening an undo session pushes a level onto the stack and increments
//! the revision clock. The level can be reverted ([`Index::undo`]),
//! collapsed into the level beneath it ([`Index::squash`]), or made
//! irrevocable ([`Index::commit`]). Sessions nest to arbitrary depth.

mod session;
mod undo;


use std::collections::{BTreeMap, VecDeque};
use std::sync::Arc;

use parking_lot::RwLock;

pub use session::Session;

use crate::err::{Error, Result};
use undo::UndoState;

const TARGET: &str = "undokv::idx";

/// A uniquely-identified record in an [`Index`].
///
/// The identifier is assigned by the index at insertion time and is
/// immutable for the lifetime of the record; builders and mutators only
/// ever see the payload. Records handed out by an index are owned
/// snapshots, detached from the index by any later mutation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Record {
	/// The internal identifier, assigned at insertion
	id: u64,
	/// The opaque byte payload
	data: Vec<u8>,
}

impl Record {
	/// The identifier of this record.
	pub fn id(&self) -> u64 {
		self.id
	}

	/// The byte payload of this record.
	pub fn data(&self) -> &[u8] {
		&self.data
	}

	/// Mutable access to the byte payload of this record.
	pub fn data_mut(&mut self) -> &mut Vec<u8> {
		&mut self.data
	}
}

/// An ordered collection of records with a stack of undo states.
///
/// An index is a cheap-to-clone handle; clones operate on the same
/// underlying collection. Reads may proceed concurrently, but mutation
/// assumes a single logical writer.
#[derive(Clone, Default)]
pub struct Index {
	inner: Arc<RwLock<Inner>>,
}

#[derive(Default)]
struct Inner {
	/// The live records, keyed by id
	live: BTreeMap<u64, Record>,
	/// The next id to assign, never reused
	next_id: u64,
	/// The current revision
	revision: i64,
	/// The open levels, oldest at the front
	stack: VecDeque<UndoState>,
}

impl Index {
	/// Create a new empty index at revision 0.
	pub fn new() -> Index {
		Index::default()
	}

	/// Insert a new record, assigning it a fresh id.
	///
	/// The builder is invoked with the record to populate and can observe
	/// the assigned id. Returns a snapshot of the inserted record, or
	/// [`Error::UniquenessViolation`] if the record collides with an
	/// existing one.
	pub fn emplace<F>(&self, build: F) -> Result<Record>
	where
		F: FnOnce(&mut Record),
	{
		self.inner.write().emplace(build)
	}

	/// Modify the record with the given id.
	///
	/// The pre-image is captured for undo before the mutator is applied.
	pub fn modify<F>(&self, id: u64, m: F) -> Result<()>
	where
		F: FnOnce(&mut Record),
	{
		self.inner.write().modify(id, m)
	}

	/// Remove the record with the given id.
	///
	/// The pre-image is captured for undo before the record is erased.
	pub fn remove(&self, id: u64) -> Result<()> {
		self.inner.write().remove(id)
	}

	/// Fetch a snapshot of the record with the given id, if present.
	pub fn find(&self, id: u64) -> Option<Record> {
		self.inner.read().live.get(&id).cloned()
	}

	/// Fetch a snapshot of the record with the given id.
	pub fn get(&self, id: u64) -> Result<Record> {
		self.find(id).ok_or(Error::NotFound(id))
	}

	/// The number of live records in this index.
	pub fn len(&self) -> usize {
		self.inner.read().live.len()
	}

	/// Check if this index holds no live records.
	pub fn is_empty(&self) -> bool {
		self.inner.read().live.is_empty()
	}

	/// Open a new undo session over this index.
	///
	/// If enabled, a fresh level is pushed onto the undo stack and the
	/// returned [`Session`] is bound to it; dropping the session without
	/// further action reverts the level. If not enabled, the returned
	/// session is inert and performs no action on drop.
	pub fn start_undo_session(&self, enabled: bool) -> Session {
		if !enabled {
			return Session::inert();
		}
		let revision = self.inner.write().open_level();
		trace!(target: TARGET, revision, "Opened undo session");
		Session::new(self.clone(), revision)
	}

	/// The current revision of this index.
	pub fn revision(&self) -> i64 {
		self.inner.read().revision
	}

	/// Revert the top level of the undo stack, restoring the state that
	/// existed just before it was opened. A no-op if the stack is empty.
	pub fn undo(&self) {
		self.inner.write().undo();
	}

	/// Collapse the top level of the undo stack into the level beneath it,
	/// so that a later undo reverts both. With a single level on the stack
	/// the level is discarded and its changes are kept. A no-op if the
	/// stack is empty.
	pub fn squash(&self) {
		self.inner.write().squash();
	}

	/// Irrevocably drop every level with a revision at or below the given
	/// revision. The current revision is unchanged.
	pub fn commit(&self, revision: i64) {
		self.inner.write().commit(revision);
	}

	/// Revert every level on the undo stack.
	pub fn undo_all(&self) {
		self.inner.write().undo_all();
	}

	/// Set the revision clock of this index.
	///
	/// Only legal while the undo stack is empty. Used to align a newly
	/// created index with its peers in a database.
	pub fn set_revision(&self, revision: u64) -> Result<()> {
		self.inner.write().set_revision(revision)
	}

	/// The revision range covered by the undo stack, as `(begin, end)`.
	///
	/// `begin` is the revision that would be observed after undoing every
	/// level; `end` is the current revision. Both equal the current
	/// revision when the stack is empty.
	pub fn undo_stack_revision_range(&self) -> (i64, i64) {
		self.inner.read().undo_stack_revision_range()
	}

	/// Check if this index has no open levels.
	pub(crate) fn undo_stack_is_empty(&self) -> bool {
		self.inner.read().stack.is_empty()
	}
}

impl Inner {
	fn emplace<F>(&mut self, build: F) -> Result<Record>
	where
		F: FnOnce(&mut Record),
	{
		// Assign the next fresh id
		let id = self.next_id;
		// Populate the payload, with the assigned id visible to the builder
		let mut record = Record {
			id,
			data: Vec::new(),
		};
		build(&mut record);
		// Insert the record, refusing to displace an existing one
		if self.live.contains_key(&id) {
			return Err(Error::UniquenessViolation);
		}
		self.live.insert(id, record.clone());
		self.next_id += 1;
		// Record the creation in the top level
		if let Some(head) = self.stack.back_mut() {
			head.created(id);
		}
		Ok(record)
	}

	fn modify<F>(&mut self, id: u64, m: F) -> Result<()>
	where
		F: FnOnce(&mut Record),
	{
		// Fetch the record, ensuring it exists
		let Some(record) = self.live.get_mut(&id) else {
			return Err(Error::NotFound(id));
		};
		// Capture the pre-image in the top level
		if let Some(head) = self.stack.back_mut() {
			head.modified(record);
		}
		// Apply the mutation
		m(record);
		Ok(())
	}

	fn remove(&mut self, id: u64) -> Result<()> {
		// Fetch the record, ensuring it exists
		let Some(record) = self.live.get(&id) else {
			return Err(Error::NotFound(id));
		};
		// Capture the pre-image in the top level
		if let Some(head) = self.stack.back_mut() {
			head.removed(record);
		}
		// Erase the record from the live set
		self.live.remove(&id);
		Ok(())
	}

	fn open_level(&mut self) -> i64 {
		self.revision += 1;
		self.stack.push_back(UndoState::new(self.next_id, self.revision));
		self.revision
	}

	fn undo(&mut self) {
		// Check whether there is anything to undo
		let Some(head) = self.stack.pop_back() else {
			return;
		};
		trace!(target: TARGET, revision = head.revision, "Undoing level");
		// Erase every record created at this level
		for id in head.new_ids {
			self.live.remove(&id);
		}
		// Restore the id allocation baseline
		self.next_id = head.old_next_id;
		// Restore the pre-images of modified records
		for (id, record) in head.old_values {
			if self.live.insert(id, record).is_none() {
				fatal!(target: TARGET, "Undo could not find record {id} to restore, the index state is corrupted");
			}
		}
		// Re-insert the pre-images of removed records
		for (id, record) in head.removed_values {
			if self.live.insert(id, record).is_some() {
				fatal!(target: TARGET, "Undo found record {id} already present on re-insert, the index state is corrupted");
			}
		}
		self.revision -= 1;
	}

	fn squash(&mut self) {
		// Check whether there is anything to squash
		let Some(head) = self.stack.pop_back() else {
			return;
		};
		trace!(target: TARGET, revision = head.revision, "Squashing level");
		// Fold into the level beneath, or discard a sole remaining level
		if let Some(prev) = self.stack.back_mut() {
			prev.absorb(head);
		}
		self.revision -= 1;
	}

	fn commit(&mut self, revision: i64) {
		trace!(target: TARGET, revision, "Committing levels");
		// Drop from the front every level at or below the given revision
		while self.stack.front().is_some_and(|level| level.revision <= revision) {
			self.stack.pop_front();
		}
	}

	fn undo_all(&mut self) {
		while !self.stack.is_empty() {
			self.undo();
		}
	}

	fn set_revision(&mut self, revision: u64) -> Result<()> {
		// The undo stack must be empty
		if !self.stack.is_empty() {
			return Err(Error::InvalidState);
		}
		// The revision must fit the signed revision clock
		if revision > i64::MAX as u64 {
			return Err(Error::OutOfRange);
		}
		self.revision = revision as i64;
		Ok(())
	}

	fn undo_stack_revision_range(&self) -> (i64, i64) {
		match (self.stack.front(), self.stack.back()) {
			(Some(front), Some(back)) => (front.revision - 1, back.revision),
			_ => (self.revision, self.revision),
		}
	}
}

#[cfg(test)]
impl Index {
	/// Run a closure over the undo stack, for state inspection in tests.
	fn with_levels<F, R>(&self, f: F) -> R
	where
		F: FnOnce(&VecDeque<UndoState>) -> R,
	{
		f(&self.inner.read().stack)
	}

	/// The next id this index would assign.
	fn next_id(&self) -> u64 {
		self.inner.read().next_id
	}

	/// A copy of the observable state: live records, id counter, revision.
	fn snapshot(&self) -> (BTreeMap<u64, Record>, u64, i64) {
		let inner = self.inner.read();
		(inner.live.clone(), inner.next_id, inner.revision)
	}

	/// Assert the structural invariants of the index and its undo stack.
	fn check_invariants(&self) {
		let inner = self.inner.read();
		for (n, level) in inner.stack.iter().enumerate() {
			// The changelog sets of every level are pairwise disjoint
			for id in &level.new_ids {
				assert!(!level.old_values.contains_key(id));
				assert!(!level.removed_values.contains_key(id));
			}
			for id in level.old_values.keys() {
				assert!(!level.removed_values.contains_key(id));
			}
			// Level revisions increase front to back by exactly 1
			let depth = (inner.stack.len() - 1 - n) as i64;
			assert_eq!(level.revision, inner.revision - depth);
		}
		if let Some(head) = inner.stack.back() {
			// Created records are live, removed records are not
			for id in &head.new_ids {
				assert!(inner.live.contains_key(id));
			}
			for id in head.removed_values.keys() {
				assert!(!inner.live.contains_key(id));
			}
		}
		// The id counter lies beyond every live id
		if let Some((max, _)) = inner.live.iter().next_back() {
			assert!(inner.next_id > *max);
		}
	}
}
