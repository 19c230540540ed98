use std::path::{Path, PathBuf};

use log::{debug, warn};

use crate::{
    cache::{Cache, RunStatistics},
    config::{CacheConfig, ConfigError},
    geometry::Geometry,
    replacement::build_policy,
    trace::{AccessKind, TraceError, TraceReader, TraceRecord, trace_name},
};

/// Replays one trace against one cache.
pub struct TraceSimulator {
    cache: Cache,
}

impl TraceSimulator {
    pub fn new(cache: Cache) -> Self {
        Self { cache }
    }

    /// Feeds every record to the cache in order. The first bad record aborts the run.
    pub fn run<I>(mut self, records: I) -> Result<RunStatistics, TraceError>
    where
        I: IntoIterator<Item = Result<TraceRecord, TraceError>>,
    {
        for record in records {
            let record = record?;
            self.cache.access(record.address);
        }
        Ok(self.cache.into_stats())
    }
}

pub struct TraceResult {
    pub trace_name: String,
    pub path: PathBuf,
    /// Leading instruction fetches of the trace, kept for the report.
    pub preview: Vec<TraceRecord>,
    pub outcome: Result<RunStatistics, TraceError>,
}

/// Runs every trace against its own freshly built cache.
///
/// The config is checked once up front; a trace that fails to parse does not
/// stop the ones after it.
pub fn run_traces(
    config: &CacheConfig,
    seed: Option<u64>,
    paths: &[PathBuf],
    preview_len: usize,
) -> Result<(Geometry, Vec<TraceResult>), ConfigError> {
    let geometry = Geometry::compute(config)?;
    debug!(
        "geometry: {} rows x {} ways, tag/index/offset = {}/{}/{} bits",
        geometry.total_rows,
        geometry.associativity,
        geometry.tag_bits,
        geometry.index_bits,
        geometry.offset_bits
    );

    let mut results = Vec::with_capacity(paths.len());
    for path in paths {
        let cache = Cache::with_policy(geometry.clone(), build_policy(config.replacement, seed));
        let result = run_file(cache, path, preview_len);
        match &result.outcome {
            Ok(stats) => debug!(
                "{}: {} accesses, {} hits, {} misses",
                result.trace_name, stats.accesses, stats.hits, stats.misses
            ),
            Err(err) => warn!("{}: simulation aborted: {err}", result.trace_name),
        }
        results.push(result);
    }
    Ok((geometry, results))
}

fn run_file(cache: Cache, path: &Path, preview_len: usize) -> TraceResult {
    let mut preview = Vec::with_capacity(preview_len);
    let outcome = TraceReader::open(path).and_then(|reader| {
        let records = reader.inspect(|record| {
            if let Ok(record) = record {
                if record.kind == AccessKind::InstructionFetch && preview.len() < preview_len {
                    preview.push(*record);
                }
            }
        });
        TraceSimulator::new(cache).run(records)
    });
    TraceResult {
        trace_name: trace_name(path),
        path: path.to_path_buf(),
        preview,
        outcome,
    }
}
