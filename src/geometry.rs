use crate::config::{CacheConfig, ConfigError, KIB, ReplacementKind};

pub const ADDRESS_BITS: u32 = 32;
pub const COST_PER_KIB: f64 = 0.15;

/// Shape of a cache derived once from its config.
#[derive(Debug, Clone, PartialEq)]
pub struct Geometry {
    pub total_blocks: u64,
    pub offset_bits: u32,
    pub index_bits: u32,
    pub tag_bits: u32,
    pub total_rows: u64,
    pub associativity: usize,
    /// `2^block_size + 2^index_bits`. Kept as the reference calculator
    /// defines it even though it is not a physical storage figure.
    pub overhead_bytes: u128,
    pub implementation_bytes: u128,
    pub implementation_kib: u128,
    pub cost_usd: f64,
    /// Tag plus valid bit stored with every line.
    pub metadata_bits_per_line: u32,
    /// Line metadata plus the per-set round-robin cursor, rounded up to bytes.
    pub metadata_bytes: u64,
}

/// A 32-bit address split into its tag, set index and block offset.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AddressParts {
    pub tag: u32,
    pub index: u32,
    pub offset: u32,
}

impl Geometry {
    pub fn compute(config: &CacheConfig) -> Result<Self, ConfigError> {
        config.validate()?;

        let (offset_bits, index_bits, tag_bits) =
            bit_widths(config.cache_size, config.block_size, config.set_bytes())?;

        let total_blocks = config.cache_size / config.block_size;
        let total_rows = 1u64 << index_bits;

        let overhead_bytes = (1u128 << config.block_size) + (1u128 << index_bits);
        let implementation_bytes = config.cache_size as u128 + overhead_bytes;
        let implementation_kib = implementation_bytes / KIB as u128;
        let cost_usd = implementation_kib as f64 * COST_PER_KIB;

        let metadata_bits_per_line = tag_bits + 1;
        let cursor_bits = match config.replacement {
            ReplacementKind::RoundRobin => config.associativity.ilog2() as u64,
            ReplacementKind::Random => 0,
        };
        let metadata_bits = total_blocks * metadata_bits_per_line as u64 + total_rows * cursor_bits;

        Ok(Self {
            total_blocks,
            offset_bits,
            index_bits,
            tag_bits,
            total_rows,
            associativity: config.associativity,
            overhead_bytes,
            implementation_bytes,
            implementation_kib,
            cost_usd,
            metadata_bits_per_line,
            metadata_bytes: metadata_bits.div_ceil(8),
        })
    }

    pub fn decode(&self, address: u32) -> AddressParts {
        AddressParts {
            offset: address & low_mask(self.offset_bits),
            index: shift_right(address, self.offset_bits) & low_mask(self.index_bits),
            tag: shift_right(address, self.offset_bits + self.index_bits),
        }
    }

    /// Inverse of [`Geometry::decode`].
    pub fn compose(&self, parts: AddressParts) -> u32 {
        shift_left(parts.tag, self.offset_bits + self.index_bits)
            | shift_left(parts.index, self.offset_bits)
            | parts.offset
    }
}

/// Offset, index and tag widths for power-of-two sizes.
fn bit_widths(
    cache_size: u64,
    block_size: u64,
    set_bytes: u64,
) -> Result<(u32, u32, u32), ConfigError> {
    let offset_bits = block_size.ilog2();
    let index_bits = (cache_size / set_bytes).ilog2();
    let tag_bits = ADDRESS_BITS
        .checked_sub(offset_bits + index_bits)
        .ok_or(ConfigError::AddressSpaceExceeded {
            offset_bits,
            index_bits,
            address_bits: ADDRESS_BITS,
        })?;
    Ok((offset_bits, index_bits, tag_bits))
}

fn low_mask(bits: u32) -> u32 {
    shift_left(1, bits).wrapping_sub(1)
}

fn shift_right(value: u32, bits: u32) -> u32 {
    value.checked_shr(bits).unwrap_or(0)
}

fn shift_left(value: u32, bits: u32) -> u32 {
    value.checked_shl(bits).unwrap_or(0)
}
