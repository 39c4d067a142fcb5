use super::{Database, DatastoreMode};
use crate::err::Error;
use crate::idx::Index;

fn concat_merge(_key: &[u8], existing: Option<&[u8]>, operand: &[u8]) -> Vec<u8> {
	let mut out = existing.map(|v| v.to_vec()).unwrap_or_default();
	out.extend_from_slice(operand);
	out
}

fn assert_lockstep(db: &Database) {
	let revision = db.revision();
	let range = db.undo_stack_revision_range();
	for index in db.indexes() {
		assert_eq!(index.revision(), revision);
		assert_eq!(index.undo_stack_revision_range(), range);
	}
}

#[test]
fn empty_database_reports_no_revision() {
	#[cfg(feature = "kv-mem")]
	{
		let db = Database::new("memory", DatastoreMode::ReadWrite).unwrap();
		assert_eq!(db.revision(), -1);
		assert_eq!(db.undo_stack_revision_range(), (-1, -1));
	}
}

#[test]
fn unknown_storage_engine_is_rejected() {
	assert!(matches!(
		Database::new("tikv://remote", DatastoreMode::ReadWrite),
		Err(Error::Datastore(_))
	));
}

#[cfg(feature = "kv-mem")]
#[test]
fn database_session_spans_all_indexes() {
	let mut db = Database::new("memory", DatastoreMode::ReadWrite).unwrap();
	let users = Index::new();
	let posts = Index::new();
	db.add_index(users.clone()).unwrap();
	db.add_index(posts.clone()).unwrap();
	{
		let mut session = db.start_undo_session(true);
		assert_eq!(session.revision(), 1);
		users.emplace(|r| r.data_mut().extend_from_slice(b"u")).unwrap();
		posts.emplace(|r| r.data_mut().extend_from_slice(b"p")).unwrap();
		assert_lockstep(&db);
		session.undo();
	}
	assert!(users.is_empty());
	assert!(posts.is_empty());
	assert_eq!(db.revision(), 0);
	assert_lockstep(&db);
}

#[cfg(feature = "kv-mem")]
#[test]
fn database_session_drop_reverts_all_indexes() {
	let mut db = Database::new("memory", DatastoreMode::ReadWrite).unwrap();
	let users = Index::new();
	db.add_index(users.clone()).unwrap();
	{
		let _session = db.start_undo_session(true);
		users.emplace(|r| r.data_mut().extend_from_slice(b"u")).unwrap();
	}
	assert!(users.is_empty());
	assert_eq!(db.revision(), 0);
}

#[cfg(feature = "kv-mem")]
#[test]
fn database_session_squash_folds_all_indexes() {
	let mut db = Database::new("memory", DatastoreMode::ReadWrite).unwrap();
	let users = Index::new();
	db.add_index(users.clone()).unwrap();
	users.emplace(|r| r.data_mut().extend_from_slice(b"a")).unwrap();
	let mut s1 = db.start_undo_session(true);
	users.modify(0, |r| r.data_mut().push(b'b')).unwrap();
	let mut s2 = db.start_undo_session(true);
	users.remove(0).unwrap();
	s2.squash();
	assert_lockstep(&db);
	s1.undo();
	assert_eq!(users.get(0).unwrap().data(), b"a");
	assert_eq!(db.revision(), 0);
	assert_lockstep(&db);
}

#[cfg(feature = "kv-mem")]
#[test]
fn database_level_operations_fan_out() {
	let mut db = Database::new("memory", DatastoreMode::ReadWrite).unwrap();
	let users = Index::new();
	let posts = Index::new();
	db.add_index(users.clone()).unwrap();
	db.add_index(posts.clone()).unwrap();
	for n in 0..3u8 {
		let mut session = db.start_undo_session(true);
		users.emplace(|r| r.data_mut().push(n)).unwrap();
		posts.emplace(|r| r.data_mut().push(n)).unwrap();
		session.push();
	}
	assert_eq!(db.revision(), 3);
	assert_eq!(db.undo_stack_revision_range(), (0, 3));
	assert_lockstep(&db);
	db.commit(2);
	assert_eq!(db.undo_stack_revision_range(), (2, 3));
	assert_lockstep(&db);
	db.undo_all();
	// Only the level above the committed revision was reverted
	assert_eq!(db.revision(), 2);
	assert_eq!(users.len(), 2);
	assert_eq!(posts.len(), 2);
	assert_lockstep(&db);
}

#[cfg(feature = "kv-mem")]
#[test]
fn disabled_database_session_is_inert() {
	let mut db = Database::new("memory", DatastoreMode::ReadWrite).unwrap();
	let users = Index::new();
	db.add_index(users.clone()).unwrap();
	{
		let session = db.start_undo_session(false);
		assert_eq!(session.revision(), -1);
		users.emplace(|r| r.data_mut().extend_from_slice(b"u")).unwrap();
	}
	assert_eq!(users.len(), 1);
	assert_eq!(db.revision(), 0);
}

#[cfg(feature = "kv-mem")]
#[test]
fn added_index_is_aligned_to_the_shared_range() {
	let mut db = Database::new("memory", DatastoreMode::ReadWrite).unwrap();
	let first = Index::new();
	first.set_revision(4).unwrap();
	for _ in 0..3 {
		first.start_undo_session(true).push();
	}
	db.add_index(first).unwrap();
	assert_eq!(db.undo_stack_revision_range(), (4, 7));
	// A freshly created index is aligned regardless of its revision
	let second = Index::new();
	second.set_revision(5).unwrap();
	db.add_index(second).unwrap();
	assert_eq!(db.revision(), 7);
	assert_lockstep(&db);
}

#[cfg(feature = "kv-mem")]
#[test]
fn added_index_with_matching_range_is_accepted() {
	let mut db = Database::new("memory", DatastoreMode::ReadWrite).unwrap();
	for _ in 0..2 {
		let index = Index::new();
		index.set_revision(4).unwrap();
		for _ in 0..3 {
			index.start_undo_session(true).push();
		}
		db.add_index(index).unwrap();
	}
	assert_eq!(db.undo_stack_revision_range(), (4, 7));
	assert_lockstep(&db);
}

#[cfg(feature = "kv-mem")]
#[test]
fn added_index_with_mismatched_stack_is_rejected() {
	let mut db = Database::new("memory", DatastoreMode::ReadWrite).unwrap();
	let first = Index::new();
	first.set_revision(4).unwrap();
	first.start_undo_session(true).push();
	db.add_index(first).unwrap();
	// An index with an undo stack of its own cannot be aligned
	let second = Index::new();
	second.start_undo_session(true).push();
	assert!(matches!(db.add_index(second), Err(Error::CorruptedState(_))));
}

#[cfg(feature = "kv-mem")]
#[test]
fn memory_store_round_trip() {
	let db = Database::new_with_merge("memory", DatastoreMode::ReadWrite, concat_merge).unwrap();
	assert!(!db.is_read_only());
	assert!(matches!(db.get(1), Err(Error::NotFound(1))));
	db.put(1, b"a".to_vec()).unwrap();
	assert_eq!(db.get(1).unwrap(), b"a".to_vec());
	db.merge(1, b"b".to_vec()).unwrap();
	assert_eq!(db.get(1).unwrap(), b"ab".to_vec());
	// Merging into an absent key stores the operand
	db.merge(2, b"z".to_vec()).unwrap();
	assert_eq!(db.get(2).unwrap(), b"z".to_vec());
	db.del(1).unwrap();
	assert!(matches!(db.get(1), Err(Error::NotFound(1))));
	db.shutdown();
}

#[cfg(feature = "kv-mem")]
#[test]
fn default_merge_overwrites() {
	let db = Database::new("memory", DatastoreMode::ReadWrite).unwrap();
	db.put(1, b"a".to_vec()).unwrap();
	db.merge(1, b"b".to_vec()).unwrap();
	assert_eq!(db.get(1).unwrap(), b"b".to_vec());
}

#[cfg(feature = "kv-mem")]
#[test]
fn read_only_database_rejects_writes() {
	let db = Database::new("memory", DatastoreMode::ReadOnly).unwrap();
	assert!(db.is_read_only());
	assert!(matches!(db.put(1, vec![1]), Err(Error::ReadOnlyViolation)));
	assert!(matches!(db.del(1), Err(Error::ReadOnlyViolation)));
	assert!(matches!(db.merge(1, vec![1]), Err(Error::ReadOnlyViolation)));
	// Reads are still permitted
	assert!(matches!(db.get(1), Err(Error::NotFound(1))));
}

#[cfg(feature = "kv-rocksdb")]
#[test]
fn rocksdb_store_round_trip() {
	let dir = tempfile::tempdir().unwrap();
	let path = dir.path().to_str().unwrap().to_string();
	{
		let db = Database::new_with_merge(&path, DatastoreMode::ReadWrite, concat_merge).unwrap();
		assert!(!db.is_read_only());
		db.put(1, b"a".to_vec()).unwrap();
		db.merge(1, b"b".to_vec()).unwrap();
		db.merge(2, b"z".to_vec()).unwrap();
		assert_eq!(db.get(1).unwrap(), b"ab".to_vec());
		assert_eq!(db.get(2).unwrap(), b"z".to_vec());
		db.del(2).unwrap();
		assert!(matches!(db.get(2), Err(Error::NotFound(2))));
		db.shutdown();
	}
	// Reopen the same directory in read-only mode
	let db = Database::new_with_merge(&path, DatastoreMode::ReadOnly, concat_merge).unwrap();
	assert!(db.is_read_only());
	assert_eq!(db.get(1).unwrap(), b"ab".to_vec());
	assert!(matches!(db.put(3, vec![1]), Err(Error::ReadOnlyViolation)));
	assert!(matches!(db.get(9), Err(Error::NotFound(9))));
	db.shutdown();
}
