use std::fmt;

use crate::{
    cache::RunStatistics,
    config::{CacheConfig, KIB},
    geometry::Geometry,
    simulator::TraceResult,
};

pub const BANNER: &str = "Cache Simulator";

/// Input parameters and derived geometry, as printed before each trace.
pub struct GeometryReport<'a> {
    pub config: &'a CacheConfig,
    pub geometry: &'a Geometry,
}

impl fmt::Display for GeometryReport<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let cfg = self.config;
        let geo = self.geometry;
        writeln!(f, "***** Cache Input Parameters *****")?;
        writeln!(f)?;
        writeln!(f, "{:<24}{} KB", "Cache Size:", cfg.cache_size / KIB)?;
        writeln!(f, "{:<24}{} bytes", "Block Size:", cfg.block_size)?;
        writeln!(f, "{:<24}{}", "Associativity:", cfg.associativity)?;
        writeln!(f, "{:<24}{}", "Replacement Policy:", cfg.replacement)?;
        writeln!(f, "{:<24}{} KB", "Physical Memory:", cfg.physical_memory / KIB)?;
        writeln!(f)?;
        writeln!(f, "***** Cache Calculated Values *****")?;
        writeln!(f)?;
        writeln!(f, "{:<24}{}", "Total Blocks:", geo.total_blocks)?;
        writeln!(f, "{:<24}{} bits", "Tag Size:", geo.tag_bits)?;
        writeln!(f, "{:<24}{} bits", "Index Size:", geo.index_bits)?;
        writeln!(f, "{:<24}{}", "Total Rows:", geo.total_rows)?;
        writeln!(f, "{:<24}{} bytes", "Overhead Size:", geo.overhead_bytes)?;
        writeln!(
            f,
            "{:<24}{} KB ({} bytes)",
            "Implementation Memory:", geo.implementation_kib, geo.implementation_bytes
        )?;
        writeln!(f, "{:<24}${:.2}", "Cost:", geo.cost_usd)?;
        writeln!(
            f,
            "{:<24}{} bytes ({} bits per line)",
            "Tag/Valid Metadata:", geo.metadata_bytes, geo.metadata_bits_per_line
        )
    }
}

pub struct StatsReport<'a>(pub &'a RunStatistics);

impl fmt::Display for StatsReport<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let stats = self.0;
        writeln!(f, "***** Cache Simulation Results *****")?;
        writeln!(f)?;
        writeln!(f, "{:<24}{}", "Total Cache Accesses:", stats.accesses)?;
        writeln!(f, "{:<24}{}", "Cache Hits:", stats.hits)?;
        writeln!(f, "{:<24}{}", "Cache Misses:", stats.misses)?;
        writeln!(f, "{:<24}{}", "--- Compulsory Misses:", stats.compulsory_misses)?;
        writeln!(f, "{:<24}{}", "--- Conflict Misses:", stats.conflict_misses)?;
        writeln!(f)?;
        writeln!(f, "{:<24}{:.4}%", "Hit Rate:", stats.hit_rate() * 100.0)?;
        writeln!(f, "{:<24}{:.4}%", "Miss Rate:", stats.miss_rate() * 100.0)
    }
}

/// Full report for one trace file. A failed trace prints its parameters and the error.
pub struct TraceReport<'a> {
    pub config: &'a CacheConfig,
    pub geometry: &'a Geometry,
    pub result: &'a TraceResult,
}

impl fmt::Display for TraceReport<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Trace File: {}", self.result.path.display())?;
        writeln!(f)?;
        write!(
            f,
            "{}",
            GeometryReport {
                config: self.config,
                geometry: self.geometry,
            }
        )?;
        if !self.result.preview.is_empty() {
            writeln!(f)?;
            for record in &self.result.preview {
                writeln!(f, "0x{:08x}: {:02}", record.address, record.length)?;
            }
        }
        writeln!(f)?;
        match &self.result.outcome {
            Ok(stats) => write!(f, "{}", StatsReport(stats)),
            Err(err) => writeln!(f, "Simulation aborted: {err}"),
        }
    }
}
