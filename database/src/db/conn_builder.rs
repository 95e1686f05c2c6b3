use crate::db::DB;
use rocksdb::{BlockBasedOptions, DBCompressionType, DBWithThreadMode, MultiThreaded};
use std::thread::available_parallelism;
use std::{path::PathBuf, sync::Arc};

const KB: usize = 1024;
const MB: usize = 1024 * KB;
const GB: usize = 1024 * MB;

#[derive(Debug)]
pub struct Unspecified;

/// Builds RocksDB connections. The path and the open-files limit must be provided before `build`
/// becomes available.
#[derive(Debug)]
pub struct ConnBuilder<Path, FDLimit> {
    db_path: Path,
    create_if_missing: bool,
    parallelism: usize,
    files_limit: FDLimit,
    mem_budget: usize,
    stats_period: Option<u32>,
}

impl Default for ConnBuilder<Unspecified, Unspecified> {
    fn default() -> Self {
        ConnBuilder {
            db_path: Unspecified,
            create_if_missing: true,
            parallelism: 1,
            mem_budget: 64 * MB,
            stats_period: None,
            files_limit: Unspecified,
        }
    }
}

impl<Path, FDLimit> ConnBuilder<Path, FDLimit> {
    pub fn with_db_path(self, db_path: PathBuf) -> ConnBuilder<PathBuf, FDLimit> {
        ConnBuilder {
            db_path,
            files_limit: self.files_limit,
            create_if_missing: self.create_if_missing,
            parallelism: self.parallelism,
            mem_budget: self.mem_budget,
            stats_period: self.stats_period,
        }
    }
    pub fn with_create_if_missing(self, create_if_missing: bool) -> ConnBuilder<Path, FDLimit> {
        ConnBuilder { create_if_missing, ..self }
    }
    pub fn with_parallelism(self, parallelism: impl Into<usize>) -> ConnBuilder<Path, FDLimit> {
        ConnBuilder { parallelism: parallelism.into(), ..self }
    }
    pub fn with_mem_budget(self, mem_budget: impl Into<usize>) -> ConnBuilder<Path, FDLimit> {
        ConnBuilder { mem_budget: mem_budget.into(), ..self }
    }
    pub fn with_stats_period(self, stats_period: impl Into<u32>) -> ConnBuilder<Path, FDLimit> {
        ConnBuilder { stats_period: Some(stats_period.into()), ..self }
    }
    pub fn with_files_limit(self, files_limit: impl Into<i32>) -> ConnBuilder<Path, i32> {
        ConnBuilder {
            db_path: self.db_path,
            files_limit: files_limit.into(),
            create_if_missing: self.create_if_missing,
            parallelism: self.parallelism,
            mem_budget: self.mem_budget,
            stats_period: self.stats_period,
        }
    }
}

impl ConnBuilder<PathBuf, i32> {
    fn options(&self) -> rocksdb::Options {
        let mut opts = rocksdb::Options::default();
        if self.parallelism > 1 {
            opts.increase_parallelism(self.parallelism as i32);
        }

        {
            let background_jobs = available_parallelism().map(|n| n.get() / 2).unwrap_or(1).max(1);
            opts.set_max_background_jobs(background_jobs as i32);
            opts.set_compaction_readahead_size(2 * MB);
            opts.set_level_zero_stop_writes_trigger(36);
            opts.set_level_zero_slowdown_writes_trigger(20);
        }
        {
            // Serialized blocks are large and written in big batches, so a few sizeable
            // memtables sized off the memory budget absorb a whole flush
            let buffer_size = (self.mem_budget / 4).max(4 * MB);
            let min_to_merge = 2i32;
            let trigger = 8i32;

            opts.set_write_buffer_size(buffer_size);
            opts.set_max_write_buffer_number(4);
            opts.set_min_write_buffer_number_to_merge(min_to_merge);
            opts.set_level_zero_file_num_compaction_trigger(trigger);
            opts.set_max_bytes_for_level_base(min_to_merge as u64 * trigger as u64 * buffer_size as u64);
            opts.set_target_file_size_base(64 * MB as u64);

            opts.set_bytes_per_sync(MB as u64);
            opts.set_max_total_wal_size(GB as u64);
            opts.set_keep_log_file_num(1);
            opts.set_compression_per_level(&[
                DBCompressionType::None,
                DBCompressionType::Lz4,
                DBCompressionType::Lz4,
                DBCompressionType::Lz4,
                DBCompressionType::Lz4,
                DBCompressionType::Lz4,
                DBCompressionType::Lz4,
            ]);
            opts.set_level_compaction_dynamic_level_bytes(true);

            let mut b_opts = BlockBasedOptions::default();
            b_opts.set_bloom_filter(10.0, false); // point lookups by hash dominate reads
            b_opts.set_block_size(32 * KB);
            opts.set_block_based_table_factory(&b_opts);
        }
        if let Some(period) = self.stats_period {
            opts.enable_statistics();
            opts.set_report_bg_io_stats(true);
            opts.set_stats_dump_period_sec(period);
        }
        opts.set_max_open_files(self.files_limit);
        opts.create_if_missing(self.create_if_missing);
        opts
    }

    pub fn build(self) -> Result<Arc<DB>, rocksdb::Error> {
        let opts = self.options();
        let inner = <DBWithThreadMode<MultiThreaded>>::open(&opts, &self.db_path)?;
        Ok(Arc::new(DB::new(inner)))
    }
}
