/// Occupancy of a single size class
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ClassStats {
    /// Size of the blocks in this class
    pub block_size: usize,
    /// Number of blocks carved out for this class
    pub block_count: usize,
    /// Blocks currently handed out
    pub used: usize,
    /// Blocks currently sitting in the free list
    pub free: usize,
    /// Largest number of blocks that were handed out at the same time
    pub highwater: usize,
}

/// Occupancy of a whole pool, in bytes of block storage
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct PoolStats {
    /// Bytes of blocks currently handed out
    pub used_bytes: usize,
    /// Bytes of blocks currently free
    pub free_bytes: usize,
    /// Largest value `used_bytes` has reached
    pub highwater_bytes: usize,
}

#[cfg(feature = "ufmt")]
impl ufmt::uDebug for ClassStats {
    fn fmt<W>(&self, f: &mut ufmt::Formatter<'_, W>) -> Result<(), W::Error>
    where
        W: ufmt::uWrite + ?Sized,
    {
        f.debug_struct("ClassStats")?
            .field("block_size", &(self.block_size as u32))?
            .field("block_count", &(self.block_count as u32))?
            .field("used", &(self.used as u32))?
            .field("free", &(self.free as u32))?
            .field("highwater", &(self.highwater as u32))?
            .finish()
    }
}

#[cfg(feature = "ufmt")]
impl ufmt::uDebug for PoolStats {
    fn fmt<W>(&self, f: &mut ufmt::Formatter<'_, W>) -> Result<(), W::Error>
    where
        W: ufmt::uWrite + ?Sized,
    {
        f.debug_struct("PoolStats")?
            .field("used_bytes", &(self.used_bytes as u32))?
            .field("free_bytes", &(self.free_bytes as u32))?
            .field("highwater_bytes", &(self.highwater_bytes as u32))?
            .finish()
    }
}
