//! Size-class planning
//!
//! Every class `i` asks for `a_i * t + b_i` bytes worth of blocks. The planner bisects the scaling
//! parameter `t` over `0..=T_MAX` looking for the largest value whose block counts still fit in the
//! region, then hands the leftover bytes to the largest classes first.

use log::{debug, trace, warn};

use crate::{consts, util, Error};

/// Sizing rule of one class of blocks
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ClassConfig {
    /// Size of every block in this class; rounded up to a multiple of `ALIGN_SIZE`
    pub block_size: usize,
    /// Bytes this class grows by for every unit of the scaling parameter `t`
    pub a: u32,
    /// Bytes this class asks for when `t` is zero
    pub b: u32,
}

impl ClassConfig {
    /// Creates a class whose target footprint is `a * t + b` bytes
    pub const fn new(block_size: usize, a: u32, b: u32) -> Self {
        ClassConfig { block_size, a, b }
    }
}

/// Block counts chosen for every class of a region
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Plan<const N: usize> {
    block_sizes: [usize; N],
    block_counts: [usize; N],
    t: u32,
    total: usize,
}

impl<const N: usize> Plan<N> {
    /// Block size of each class, after alignment
    pub fn block_sizes(&self) -> &[usize; N] {
        &self.block_sizes
    }

    /// Number of blocks of each class
    pub fn block_counts(&self) -> &[usize; N] {
        &self.block_counts
    }

    /// The scaling parameter the search settled on
    pub fn t(&self) -> u32 {
        self.t
    }

    /// Bytes covered by all the blocks, leftover blocks included
    pub fn total(&self) -> usize {
        self.total
    }
}

/// Computes how many blocks of each class fit in `region_len` bytes
///
/// `configs` must be sorted by ascending block size. Every class gets at least one block or the
/// plan fails with [`Error::Infeasible`].
pub fn plan<const N: usize>(
    region_len: usize,
    configs: &[ClassConfig; N],
) -> Result<Plan<N>, Error> {
    let block_sizes = block_sizes(configs)?;
    let region = region_len as u64;

    let (mut block_counts, mut total) = counts_at(configs, &block_sizes, 0);
    if total > region {
        warn!(
            "the base footprint of the classes ({} bytes) exceeds the region ({} bytes)",
            total, region_len
        );
        return Err(Error::Infeasible);
    }

    let mut lo = 0;
    let (counts, sum) = counts_at(configs, &block_sizes, consts::T_MAX);
    if sum <= region {
        lo = consts::T_MAX;
        block_counts = counts;
        total = sum;
    } else {
        // invariant: `lo` fits, `hi` doesn't
        let mut hi = consts::T_MAX;
        for _ in 0..consts::MAX_SEARCH_ITERATIONS {
            if hi - lo <= 1 {
                break;
            }

            let mid = lo + (hi - lo) / 2;
            let (counts, sum) = counts_at(configs, &block_sizes, mid);
            if sum <= region {
                trace!("t = {}: {} bytes, accepted", mid, sum);
                lo = mid;
                block_counts = counts;
                total = sum;
            } else {
                trace!("t = {}: {} bytes, rejected", mid, sum);
                hi = mid;
            }
        }
    }

    debug!("t = {}: {} of {} bytes used", lo, total, region_len);

    // `total <= region <= usize::MAX`
    let mut total = total as usize;
    let mut remaining = region_len - total;
    for (i, &size) in block_sizes.iter().enumerate().rev() {
        if remaining >= size {
            let extra = remaining / size;
            block_counts[i] += extra;
            remaining -= extra * size;
            total += extra * size;

            trace!("class {}: {} leftover block(s) of {} bytes", i, extra, size);
        }
    }

    if let Some(i) = block_counts.iter().position(|&count| count == 0) {
        warn!("class {} ({} bytes) gets no blocks", i, block_sizes[i]);
        return Err(Error::Infeasible);
    }

    Ok(Plan {
        block_sizes,
        block_counts,
        t: lo,
        total,
    })
}

fn block_sizes<const N: usize>(configs: &[ClassConfig; N]) -> Result<[usize; N], Error> {
    if N == 0 {
        return Err(Error::NoClasses);
    }

    let mut sizes = [0; N];
    for (index, config) in configs.iter().enumerate() {
        if config.block_size == 0 {
            return Err(Error::ZeroBlockSize { index });
        }

        let size = util::align_block_size(config.block_size).ok_or(Error::RegionTooLarge)?;
        if index > 0 && size <= sizes[index - 1] {
            return Err(Error::UnsortedClasses { index });
        }

        sizes[index] = size;
    }

    Ok(sizes)
}

// NOTE counts that don't fit in a `usize` are only produced for totals that exceed the region so
// their truncation is never observed
fn counts_at<const N: usize>(
    configs: &[ClassConfig; N],
    block_sizes: &[usize; N],
    t: u32,
) -> ([usize; N], u64) {
    let mut counts = [0; N];
    let mut total = 0u64;
    for (i, (config, &size)) in configs.iter().zip(block_sizes).enumerate() {
        let target = u64::from(config.a) * u64::from(t) + u64::from(config.b);
        let count = target / size as u64;

        counts[i] = count as usize;
        total = total.saturating_add(count * size as u64);
    }

    (counts, total)
}
