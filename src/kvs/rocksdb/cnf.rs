use std::sync::LazyLock;

pub static ROCKSDB_THREAD_COUNT: LazyLock<i32> =
	lazy_env_parse!("UNDOKV_ROCKSDB_THREAD_COUNT", i32, || num_cpus::get() as i32);

pub static ROCKSDB_MAX_OPEN_FILES: LazyLock<i32> =
	lazy_env_parse!("UNDOKV_ROCKSDB_MAX_OPEN_FILES", i32, 1024);

pub static ROCKSDB_KEEP_LOG_FILE_NUM: LazyLock<usize> =
	lazy_env_parse!("UNDOKV_ROCKSDB_KEEP_LOG_FILE_NUM", usize, 20);

pub static ROCKSDB_COMPACTION_MEMTABLE_BUDGET: LazyLock<usize> =
	lazy_env_parse!("UNDOKV_ROCKSDB_COMPACTION_MEMTABLE_BUDGET", usize, 512 * 1024 * 1024);
