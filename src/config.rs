use std::fmt;

use clap::ValueEnum;
use thiserror::Error;

pub const KIB: u64 = 1024;

pub const MIN_CACHE_SIZE: u64 = KIB;
pub const MAX_CACHE_SIZE: u64 = 8 * KIB * KIB;
pub const MIN_BLOCK_SIZE: u64 = 4;
pub const MAX_BLOCK_SIZE: u64 = 64;
pub const ASSOCIATIVITIES: [usize; 5] = [1, 2, 4, 8, 16];
pub const MIN_PHYSICAL_MEMORY: u64 = 64 * KIB;
pub const MAX_PHYSICAL_MEMORY: u64 = 512 * KIB * KIB * KIB;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ReplacementKind {
    #[value(name = "RR")]
    RoundRobin,
    #[value(name = "RND")]
    Random,
}

impl fmt::Display for ReplacementKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReplacementKind::RoundRobin => write!(f, "Round Robin"),
            ReplacementKind::Random => write!(f, "Random"),
        }
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("cache size {0} bytes is outside 1 KB to 8 MB")]
    CacheSizeOutOfRange(u64),
    #[error("block size {0} bytes is outside 4 to 64 bytes")]
    BlockSizeOutOfRange(u64),
    #[error("block size {0} is not a power of two")]
    BlockSizeNotPowerOfTwo(u64),
    #[error("associativity {0} is not one of 1, 2, 4, 8, 16")]
    InvalidAssociativity(usize),
    #[error("physical memory {0} bytes is outside 64 KB to 512 GB")]
    PhysicalMemoryOutOfRange(u64),
    #[error("cache size {cache_size} is not a power-of-two multiple of block size x associativity ({set_bytes})")]
    UnevenSets { cache_size: u64, set_bytes: u64 },
    #[error("{offset_bits} offset bits and {index_bits} index bits exceed the {address_bits}-bit address")]
    AddressSpaceExceeded {
        offset_bits: u32,
        index_bits: u32,
        address_bits: u32,
    },
    #[error("{0} KB does not fit in a 64-bit byte count")]
    SizeOverflow(u64),
}

/// Validated cache parameters. All sizes are in bytes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheConfig {
    pub cache_size: u64,
    pub block_size: u64,
    pub associativity: usize, // set to 1 for Direct-Mapped
    pub replacement: ReplacementKind,
    pub physical_memory: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            cache_size: 32 * KIB,
            block_size: 16,
            associativity: 4,
            replacement: ReplacementKind::RoundRobin,
            physical_memory: 1024 * KIB * KIB,
        }
    }
}

impl CacheConfig {
    /// Builds a config from the KB-denominated values the command line takes.
    pub fn from_kib(
        cache_kib: u64,
        block_size: u64,
        associativity: usize,
        replacement: ReplacementKind,
        physical_kib: u64,
    ) -> Result<Self, ConfigError> {
        let config = Self {
            cache_size: kib_to_bytes(cache_kib)?,
            block_size,
            associativity,
            replacement,
            physical_memory: kib_to_bytes(physical_kib)?,
        };
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(MIN_CACHE_SIZE..=MAX_CACHE_SIZE).contains(&self.cache_size) {
            return Err(ConfigError::CacheSizeOutOfRange(self.cache_size));
        }
        if !(MIN_BLOCK_SIZE..=MAX_BLOCK_SIZE).contains(&self.block_size) {
            return Err(ConfigError::BlockSizeOutOfRange(self.block_size));
        }
        if !self.block_size.is_power_of_two() {
            return Err(ConfigError::BlockSizeNotPowerOfTwo(self.block_size));
        }
        if !ASSOCIATIVITIES.contains(&self.associativity) {
            return Err(ConfigError::InvalidAssociativity(self.associativity));
        }
        if !(MIN_PHYSICAL_MEMORY..=MAX_PHYSICAL_MEMORY).contains(&self.physical_memory) {
            return Err(ConfigError::PhysicalMemoryOutOfRange(self.physical_memory));
        }
        let set_bytes = self.set_bytes();
        if self.cache_size % set_bytes != 0 || !(self.cache_size / set_bytes).is_power_of_two() {
            return Err(ConfigError::UnevenSets {
                cache_size: self.cache_size,
                set_bytes,
            });
        }
        Ok(())
    }

    /// Bytes covered by one row: every way of a single set.
    pub fn set_bytes(&self) -> u64 {
        self.block_size * self.associativity as u64
    }
}

fn kib_to_bytes(kib: u64) -> Result<u64, ConfigError> {
    kib.checked_mul(KIB).ok_or(ConfigError::SizeOverflow(kib))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(cache_size: u64, block_size: u64, associativity: usize) -> CacheConfig {
        CacheConfig {
            cache_size,
            block_size,
            associativity,
            ..CacheConfig::default()
        }
    }

    #[test]
    fn default_is_valid() {
        assert_eq!(CacheConfig::default().validate(), Ok(()));
    }

    #[test]
    fn from_kib_converts_units() {
        let cfg = CacheConfig::from_kib(32, 16, 4, ReplacementKind::Random, 1024 * 1024).unwrap();
        assert_eq!(cfg.cache_size, 32 * 1024);
        assert_eq!(cfg.physical_memory, 1024 * 1024 * 1024);
        assert_eq!(cfg.replacement, ReplacementKind::Random);
    }

    #[test]
    fn range_bounds_are_inclusive() {
        assert_eq!(config(KIB, 4, 1).validate(), Ok(()));
        assert_eq!(config(8 * KIB * KIB, 64, 16).validate(), Ok(()));
        let mut cfg = config(KIB, 4, 1);
        cfg.physical_memory = MIN_PHYSICAL_MEMORY;
        assert_eq!(cfg.validate(), Ok(()));
        cfg.physical_memory = MAX_PHYSICAL_MEMORY;
        assert_eq!(cfg.validate(), Ok(()));
    }

    #[test]
    fn rejects_out_of_range_cache_size() {
        assert_eq!(
            config(512, 16, 1).validate(),
            Err(ConfigError::CacheSizeOutOfRange(512))
        );
        assert_eq!(
            config(16 * KIB * KIB, 16, 1).validate(),
            Err(ConfigError::CacheSizeOutOfRange(16 * KIB * KIB))
        );
    }

    #[test]
    fn rejects_bad_block_size() {
        assert_eq!(
            config(32 * KIB, 2, 1).validate(),
            Err(ConfigError::BlockSizeOutOfRange(2))
        );
        assert_eq!(
            config(32 * KIB, 128, 1).validate(),
            Err(ConfigError::BlockSizeOutOfRange(128))
        );
        assert_eq!(
            config(32 * KIB, 24, 1).validate(),
            Err(ConfigError::BlockSizeNotPowerOfTwo(24))
        );
    }

    #[test]
    fn rejects_bad_associativity() {
        for ways in [0, 3, 32] {
            assert_eq!(
                config(32 * KIB, 16, ways).validate(),
                Err(ConfigError::InvalidAssociativity(ways))
            );
        }
    }

    #[test]
    fn rejects_out_of_range_physical_memory() {
        let mut cfg = CacheConfig::default();
        cfg.physical_memory = 32 * KIB;
        assert_eq!(
            cfg.validate(),
            Err(ConfigError::PhysicalMemoryOutOfRange(32 * KIB))
        );
        cfg.physical_memory = MAX_PHYSICAL_MEMORY + 1;
        assert!(matches!(
            cfg.validate(),
            Err(ConfigError::PhysicalMemoryOutOfRange(_))
        ));
    }

    #[test]
    fn rejects_sizes_without_power_of_two_rows() {
        // 3 KB / (16 * 1) = 192 rows
        assert_eq!(
            config(3 * KIB, 16, 1).validate(),
            Err(ConfigError::UnevenSets {
                cache_size: 3 * KIB,
                set_bytes: 16
            })
        );
        // 1 KB / (64 * 16) = 1 row, still fine
        assert_eq!(config(KIB, 64, 16).validate(), Ok(()));
    }

    #[test]
    fn kib_overflow_is_an_error() {
        let err = CacheConfig::from_kib(u64::MAX, 16, 4, ReplacementKind::RoundRobin, 1024)
            .unwrap_err();
        assert_eq!(err, ConfigError::SizeOverflow(u64::MAX));
    }
}
