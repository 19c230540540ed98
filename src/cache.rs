use log::trace;

use crate::{
    config::{CacheConfig, ConfigError},
    geometry::Geometry,
    replacement::{ReplacementPolicy, build_policy},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccessOutcome {
    Hit,
    Miss,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunStatistics {
    pub accesses: u64,
    pub hits: u64,
    pub misses: u64,
    /// Misses that filled an empty line.
    pub compulsory_misses: u64,
    /// Misses that evicted a valid line.
    pub conflict_misses: u64,
}

impl RunStatistics {
    pub fn hit_rate(&self) -> f64 {
        if self.accesses == 0 {
            0.0
        } else {
            self.hits as f64 / self.accesses as f64
        }
    }

    pub fn miss_rate(&self) -> f64 {
        if self.accesses == 0 {
            0.0
        } else {
            self.misses as f64 / self.accesses as f64
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CacheLine {
    pub valid: bool,
    pub tag: u32,
    pub last_fill: u64,
}

impl CacheLine {
    fn invalid() -> Self {
        Self {
            valid: false,
            tag: 0,
            last_fill: 0,
        }
    }
}

#[derive(Debug)]
pub struct CacheSet {
    lines: Vec<CacheLine>,
    /// Next way to evict under round-robin.
    pub(crate) cursor: usize,
}

impl CacheSet {
    pub fn new(ways: usize) -> Self {
        Self {
            lines: vec![CacheLine::invalid(); ways],
            cursor: 0,
        }
    }

    pub fn ways(&self) -> usize {
        self.lines.len()
    }

    pub fn lines(&self) -> &[CacheLine] {
        &self.lines
    }

    pub fn lookup(&self, tag: u32) -> Option<usize> {
        self.lines
            .iter()
            .position(|line| line.valid && line.tag == tag)
    }

    /// Installs `tag`, preferring the lowest empty way over eviction.
    /// Returns the way written and the line it displaced, if any.
    pub fn fill(
        &mut self,
        tag: u32,
        fill_order: u64,
        policy: &mut dyn ReplacementPolicy,
    ) -> (usize, Option<CacheLine>) {
        let line = CacheLine {
            valid: true,
            tag,
            last_fill: fill_order,
        };
        if let Some(idx) = self.lines.iter().position(|line| !line.valid) {
            self.lines[idx] = line;
            return (idx, None);
        }
        let idx = policy.select_victim(self);
        let evicted = std::mem::replace(&mut self.lines[idx], line);
        (idx, Some(evicted))
    }
}

pub struct Cache {
    geometry: Geometry,
    sets: Vec<CacheSet>,
    policy: Box<dyn ReplacementPolicy>,
    stats: RunStatistics,
    fill_counter: u64,
}

impl Cache {
    /// `seed` only affects the random policy; `None` seeds from the OS.
    pub fn new(config: &CacheConfig, seed: Option<u64>) -> Result<Self, ConfigError> {
        let geometry = Geometry::compute(config)?;
        Ok(Self::with_policy(geometry, build_policy(config.replacement, seed)))
    }

    pub fn with_policy(geometry: Geometry, policy: Box<dyn ReplacementPolicy>) -> Self {
        let sets = (0..geometry.total_rows)
            .map(|_| CacheSet::new(geometry.associativity))
            .collect();
        Self {
            geometry,
            sets,
            policy,
            stats: RunStatistics::default(),
            fill_counter: 0,
        }
    }

    pub fn geometry(&self) -> &Geometry {
        &self.geometry
    }

    pub fn stats(&self) -> &RunStatistics {
        &self.stats
    }

    pub fn into_stats(self) -> RunStatistics {
        self.stats
    }

    pub fn set(&self, index: usize) -> &CacheSet {
        &self.sets[index]
    }

    pub fn access(&mut self, address: u32) -> AccessOutcome {
        self.stats.accesses += 1;
        let parts = self.geometry.decode(address);
        let set = &mut self.sets[parts.index as usize];

        if let Some(way) = set.lookup(parts.tag) {
            self.stats.hits += 1;
            trace!(
                "hit  {address:#010x} tag={:#x} index={} offset={} way={way}",
                parts.tag, parts.index, parts.offset
            );
            return AccessOutcome::Hit;
        }

        self.stats.misses += 1;
        self.fill_counter += 1;
        let (way, evicted) = set.fill(parts.tag, self.fill_counter, self.policy.as_mut());
        match evicted {
            Some(old) => {
                self.stats.conflict_misses += 1;
                trace!(
                    "miss {address:#010x} tag={:#x} index={} offset={} way={way} evicted tag={:#x}",
                    parts.tag, parts.index, parts.offset, old.tag
                );
            }
            None => {
                self.stats.compulsory_misses += 1;
                trace!(
                    "miss {address:#010x} tag={:#x} index={} offset={} way={way}",
                    parts.tag, parts.index, parts.offset
                );
            }
        }
        AccessOutcome::Miss
    }
}
