use super::Index;

/// A scoped handle over one open level of an [`Index`].
///
/// A session reverts its level when dropped, unless it was first detached
/// with [`push`](Session::push), collapsed with [`squash`](Session::squash),
/// or reverted explicitly with [`undo`](Session::undo). The first action
/// wins; subsequent actions and the eventual drop are no-ops. Sessions are
/// movable but not copyable, and a moved-from session no longer exists, so
/// a level can never be acted on twice.
pub struct Session {
	/// The index this session is bound to, cleared once actioned
	index: Option<Index>,
	/// The revision captured when the level was opened
	revision: i64,
}

impl Session {
	/// Create a session bound to an index at a revision.
	pub(super) fn new(index: Index, revision: i64) -> Self {
		Session {
			index: Some(index),
			revision,
		}
	}

	/// Create an inert session which performs no action on drop.
	pub(super) fn inert() -> Self {
		Session {
			index: None,
			revision: -1,
		}
	}

	/// Leave the level on the undo stack when this session goes out of scope.
	pub fn push(&mut self) {
		self.index = None;
	}

	/// Collapse this level into the previous level.
	pub fn squash(&mut self) {
		if let Some(index) = self.index.take() {
			index.squash();
		}
	}

	/// Revert this level.
	pub fn undo(&mut self) {
		if let Some(index) = self.index.take() {
			index.undo();
		}
	}

	/// The revision captured when this session was opened, or -1 for an
	/// inert session.
	pub fn revision(&self) -> i64 {
		self.revision
	}
}

impl Drop for Session {
	fn drop(&mut self) {
		// An unactioned session reverts its level
		if let Some(index) = self.index.take() {
			index.undo();
		}
	}
}
