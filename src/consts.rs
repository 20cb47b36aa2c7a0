// All blocks are 4-byte aligned and their sizes are always multiple of 4
pub const ALIGN_SIZE_LOG2: u8 = 2;
/// All block sizes are multiple of this number; this number is also the minimum alignment of all
/// allocations
pub const ALIGN_SIZE: u8 = 1 << ALIGN_SIZE_LOG2;

/// Upper bound of the scaling parameter `t` explored by the planner
pub const T_MAX: u32 = 1_000_000;

/// The planner gives up refining `t` after this many bisection steps
pub const MAX_SEARCH_ITERATIONS: u32 = 100;

/// First compressed value reserved for ROM pointers
///
/// Compressed in-pool pointers are always below this value
pub const ROM_BASE: u16 = 0xf800;

/// Maximum number of entries a ROM table can register
pub const MAX_ROM_ENTRIES: usize = (1 << 16) - ROM_BASE as usize;

// NOTE the free list links are stored in the first word of free blocks so the smallest block must
// hold one `u32`
#[allow(dead_code)]
const ASSERT0: [(); 0 - !(ALIGN_SIZE as usize >= core::mem::size_of::<u32>()) as usize] = [];

// NOTE the bisection needs room to run; T_MAX must not collapse the search interval
#[allow(dead_code)]
const ASSERT1: [(); 0 - !(T_MAX > 1) as usize] = [];
