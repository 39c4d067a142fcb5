use std::collections::{BTreeMap, BTreeSet};

use super::Record;

/// The changelog for a single open level of an index.
///
/// An undo state captures the minimum information required to revert the
/// index to the state that existed just before the level was opened: the
/// pre-images of records modified or removed at this level, and the ids of
/// records created at this level. The three sets are pairwise disjoint.
#[derive(Debug, Default)]
pub(super) struct UndoState {
	/// Pre-images of records that existed before this level was opened and
	/// were modified at this level. First write wins: once an id has an
	/// entry here, later modifications at this level do not overwrite it.
	pub(super) old_values: BTreeMap<u64, Record>,
	/// Pre-images of records that existed before this level was opened and
	/// were removed at this level, captured at removal time.
	pub(super) removed_values: BTreeMap<u64, Record>,
	/// Ids of records created at this level.
	pub(super) new_ids: BTreeSet<u64>,
	/// The value of the id counter when this level was opened.
	pub(super) old_next_id: u64,
	/// The revision number assigned when this level was opened.
	pub(super) revision: i64,
}

impl UndoState {
	/// Create the changelog for a freshly opened level.
	pub(super) fn new(old_next_id: u64, revision: i64) -> Self {
		UndoState {
			old_next_id,
			revision,
			..Default::default()
		}
	}

	/// Record the creation of a fresh record at this level.
	pub(super) fn created(&mut self, id: u64) {
		self.new_ids.insert(id);
	}

	/// Capture the pre-image of a record about to be modified.
	pub(super) fn modified(&mut self, value: &Record) {
		// Created at this level, so its post-undo state is already recoverable
		if self.new_ids.contains(&value.id()) {
			return;
		}
		// First write wins, so keep the pre-image captured earlier at this level
		if self.old_values.contains_key(&value.id()) {
			return;
		}
		self.old_values.insert(value.id(), value.clone());
	}

	/// Capture the pre-image of a record about to be removed.
	pub(super) fn removed(&mut self, value: &Record) {
		// Created at this level, so treat it as if it never existed
		if self.new_ids.remove(&value.id()) {
			return;
		}
		// Modified earlier at this level, so the captured pre-image is the
		// one to restore on undo, not the current value
		if let Some(pre) = self.old_values.remove(&value.id()) {
			self.removed_values.insert(value.id(), pre);
			return;
		}
		// Cannot occur while the sets stay disjoint
		if self.removed_values.contains_key(&value.id()) {
			return;
		}
		self.removed_values.insert(value.id(), value.clone());
	}

	/// Fold the level opened directly after this one into this level, so
	/// that undoing this level afterwards reverts both.
	///
	/// The id allocation baseline is left untouched: it is the baseline of
	/// the earlier level, which is the correct one to revert to.
	pub(super) fn absorb(&mut self, state: UndoState) {
		// Fold the modifications of the later level
		for (id, value) in state.old_values {
			// Create then update collapses to create
			if self.new_ids.contains(&id) {
				continue;
			}
			// Update then update keeps the earlier pre-image
			if self.old_values.contains_key(&id) {
				continue;
			}
			// Updating a record removed at this level cannot occur
			debug_assert!(!self.removed_values.contains_key(&id));
			self.old_values.insert(id, value);
		}
		// Fold the creations of the later level
		self.new_ids.extend(state.new_ids);
		// Fold the removals of the later level
		for (id, value) in state.removed_values {
			// Create then remove collapses to nothing
			if self.new_ids.remove(&id) {
				continue;
			}
			// Update then remove becomes a removal of the earlier pre-image
			if let Some(pre) = self.old_values.remove(&id) {
				self.removed_values.insert(id, pre);
				continue;
			}
			// Removing a record removed at this level cannot occur
			debug_assert!(!self.removed_values.contains_key(&id));
			self.removed_values.insert(id, value);
		}
	}
}
