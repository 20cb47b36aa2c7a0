//! 16-bit pointer compression
//!
//! A block handed out by a pool is compressed into its offset from the pool's anchor, in
//! `ALIGN_SIZE` units. Offsets start at 1 so `0` stays free to represent `None`. Values from
//! `ROM_BASE` upwards index into an optional table of read-only pointers that live outside the
//! pool.

use core::{fmt, ptr::NonNull};

use crate::{consts, Anchor, Error, Offset};

/// A set of pre-registered pointers that can be compressed alongside the pool's blocks
///
/// A ROM pointer compresses to `ROM_BASE + k` where `k` is its index in the table, so the
/// compressed values only depend on the table.
#[derive(Clone, Copy, Debug)]
pub struct RomTable<'r> {
    entries: &'r [*const u8],
    // indices into `entries`, sorted by address
    order: &'r [u16],
    min: usize,
    max: usize,
}

impl<'r> RomTable<'r> {
    /// Registers `entries`, up to the first null pointer or the end of the slice
    ///
    /// `scratch` holds the search index; it needs (at least) one slot per entry.
    pub fn new(entries: &'r [*const u8], scratch: &'r mut [u16]) -> Result<Self, Error> {
        let len = entries
            .iter()
            .position(|entry| entry.is_null())
            .unwrap_or(entries.len());
        let entries = &entries[..len];

        if len > consts::MAX_ROM_ENTRIES {
            return Err(Error::RomTableTooLarge {
                max: consts::MAX_ROM_ENTRIES,
            });
        }

        if scratch.len() < len {
            return Err(Error::ScratchTooSmall {
                len: scratch.len(),
                needed: len,
            });
        }

        let order = &mut scratch[..len];
        for (k, slot) in order.iter_mut().enumerate() {
            // `len <= MAX_ROM_ENTRIES`
            *slot = k as u16;
        }
        order.sort_unstable_by_key(|&k| entries[usize::from(k)] as usize);

        let order: &'r [u16] = order;
        let (min, max) = match (order.first(), order.last()) {
            (Some(&first), Some(&last)) => (
                entries[usize::from(first)] as usize,
                entries[usize::from(last)] as usize,
            ),
            // no address is in `min..=max`
            _ => (1, 0),
        };

        Ok(RomTable {
            entries,
            order,
            min,
            max,
        })
    }

    /// Number of registered pointers
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the table is empty
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Whether `addr` falls between the lowest and the highest registered pointer
    fn covers(&self, addr: usize) -> bool {
        self.min <= addr && addr <= self.max
    }

    fn index_of(&self, addr: usize) -> Option<u16> {
        if !self.covers(addr) {
            return None;
        }

        self.order
            .binary_search_by_key(&addr, |&k| self.entries[usize::from(k)] as usize)
            .ok()
            .map(|pos| self.order[pos])
    }

    fn get(&self, k: u16) -> Option<NonNull<u8>> {
        self.entries
            .get(usize::from(k))
            .and_then(|&entry| NonNull::new(entry as *mut u8))
    }
}

/// Maps the blocks of a [`Pool`](crate::Pool) (and the pointers of a [`RomTable`]) to 16-bit
/// values and back
///
/// Created by [`Pool::compressor`](crate::Pool::compressor)
#[derive(Clone, Copy)]
pub struct Compressor<'r> {
    anchor: Anchor,
    len: usize,
    rom: Option<RomTable<'r>>,
}

impl<'r> Compressor<'r> {
    pub(crate) fn new(
        anchor: Anchor,
        len: usize,
        rom: Option<RomTable<'r>>,
    ) -> Result<Self, Error> {
        // the last block of the pool has the largest offset
        if len >> consts::ALIGN_SIZE_LOG2 >= usize::from(consts::ROM_BASE) {
            return Err(Error::RegionTooLarge);
        }

        Ok(Compressor { anchor, len, rom })
    }

    /// Compresses `ptr`
    ///
    /// `None` compresses to `0`. Returns [`Error::NotCompressible`] if `ptr` is neither a 4-byte
    /// aligned pointer into the pool nor a registered ROM pointer. Pool blocks always compress to
    /// their offset, even when the ROM table's address range spans the pool.
    pub fn encode(&self, ptr: Option<NonNull<u8>>) -> Result<u16, Error> {
        let ptr = match ptr {
            Some(ptr) => ptr,
            None => return Ok(0),
        };

        let byte_offset = self.anchor.byte_offset(ptr);
        if byte_offset < self.len && byte_offset % usize::from(consts::ALIGN_SIZE) == 0 {
            // `Compressor::new` checked that every in-pool offset is below `ROM_BASE`
            return Ok(self.anchor.offset(ptr).get() as u16);
        }

        let addr = ptr.as_ptr() as usize;
        self.rom
            .as_ref()
            .and_then(|rom| rom.index_of(addr))
            .map(|k| consts::ROM_BASE + k)
            .ok_or(Error::NotCompressible)
    }

    /// Expands a value produced by [`Compressor::encode`]
    ///
    /// Returns `None` for `0` and for values that don't map to the pool or to a registered ROM
    /// pointer.
    pub fn decode(&self, value: u16) -> Option<NonNull<u8>> {
        if value >= consts::ROM_BASE {
            return self.rom.as_ref()?.get(value - consts::ROM_BASE);
        }

        let offset = Offset::new(u32::from(value))?;
        let byte_offset = (offset.get() as usize - 1) << consts::ALIGN_SIZE_LOG2;
        if byte_offset >= self.len {
            return None;
        }

        Some(unsafe { self.anchor.ptr(offset) })
    }

    /// The ROM table this compressor was created with
    pub fn rom(&self) -> Option<&RomTable<'r>> {
        self.rom.as_ref()
    }
}

impl fmt::Debug for Compressor<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Compressor")
            .field("base", &self.anchor.base())
            .field("len", &self.len)
            .field("rom", &self.rom)
            .finish()
    }
}
