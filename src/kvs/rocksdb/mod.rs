#![cfg(feature = "kv-rocksdb")]

mod cnf;

use rocksdb::{Options, DB};

use crate::err::{Error, Result};
use crate::kvs::{DatastoreMode, Key, MergeOperator, Val};

const TARGET: &str = "undokv::kvs::rocksdb";

pub struct Datastore {
	/// The underlying RocksDB database
	db: DB,
	/// Whether this datastore was opened for reading only
	read_only: bool,
}

impl Datastore {
	/// Open a new database
	pub(super) fn new(path: &str, mode: DatastoreMode, merge: MergeOperator) -> Result<Datastore> {
		// Configure custom options
		let mut opts = Options::default();
		// Create database if missing
		opts.create_if_missing(true);
		// Increase the background thread count
		info!(target: TARGET, "Background thread count: {}", *cnf::ROCKSDB_THREAD_COUNT);
		opts.increase_parallelism(*cnf::ROCKSDB_THREAD_COUNT);
		// Set the maximum number of open files that can be used by the database
		info!(target: TARGET, "Maximum number of open files: {}", *cnf::ROCKSDB_MAX_OPEN_FILES);
		opts.set_max_open_files(*cnf::ROCKSDB_MAX_OPEN_FILES);
		// Set the number of log files to keep
		info!(target: TARGET, "Number of log files to keep: {}", *cnf::ROCKSDB_KEEP_LOG_FILE_NUM);
		opts.set_keep_log_file_num(*cnf::ROCKSDB_KEEP_LOG_FILE_NUM);
		// Optimise the database for level-style compaction
		info!(target: TARGET, "Memtable budget for compaction: {}", *cnf::ROCKSDB_COMPACTION_MEMTABLE_BUDGET);
		opts.optimize_level_style_compaction(*cnf::ROCKSDB_COMPACTION_MEMTABLE_BUDGET);
		// Register the user-supplied merge operator, folding each
		// operand into the current value in arrival order
		opts.set_merge_operator_associative("undokv merge operator", move |key, existing, operands| {
			let mut current = existing.map(|v| v.to_vec());
			for operand in operands {
				current = Some(merge(key, current.as_deref(), operand));
			}
			current
		});
		// Open the datastore in the desired mode
		let db = match mode {
			DatastoreMode::ReadWrite => DB::open(&opts, path)?,
			DatastoreMode::ReadOnly => DB::open_for_read_only(&opts, path, false)?,
		};
		info!(target: TARGET, "Started kvs store at {path}");
		// Return the datastore
		Ok(Datastore {
			db,
			read_only: matches!(mode, DatastoreMode::ReadOnly),
		})
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
	#[instrument(level = "trace", target = "undokv::kvs::rocksdb", skip_all, fields(key = %String::from_utf8_lossy(key)))]
	pub(super) fn get(&self, key: &[u8]) -> Result<Option<Val>> {
		// Get the key
		let res = self.db.get(key)?;
		// Return result
		Ok(res)
	}

	/// Insert or update a key in the database
	#[instrument(level = "trace", target = "undokv::kvs::rocksdb", skip_all, fields(key = %String::from_utf8_lossy(&key)))]
	pub(super) fn put(&self, key: Key, val: Val) -> Result<()> {
		// Check to see if this datastore is writeable
		self.ensure_write()?;
		// Set the key
		self.db.put(key, val)?;
		// Return result
		Ok(())
	}

	/// Delete a key from the database
	#[instrument(level = "trace", target = "undokv::kvs::rocksdb", skip_all, fields(key = %String::from_utf8_lossy(key)))]
	pub(super) fn del(&self, key: &[u8]) -> Result<()> {
		// Check to see if this datastore is writeable
		self.ensure_write()?;
		// Remove the key
		self.db.delete(key)?;
		// Return result
		Ok(())
	}

	/// Merge a value into a key, applying the registered merge operator
	#[instrument(level = "trace", target = "undokv::kvs::rocksdb", skip_all, fields(key = %String::from_utf8_lossy(&key)))]
	pub(super) fn merge(&self, key: Key, val: Val) -> Result<()> {
		// Check to see if this datastore is writeable
		self.ensure_write()?;
		// Merge the key
		self.db.merge(key, val)?;
		// Return result
		Ok(())
	}

	/// Shutdown the database
	pub(super) fn shutdown(&self) {
		// A read-only handle has nothing to flush
		if self.read_only {
			return;
		}
		// Flush the memtables to disk
		if let Err(e) = self.db.flush() {
			error!(target: TARGET, "An error occured flushing memtables to disk: {e}");
		}
	}
}
