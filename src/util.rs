use core::ops::{Add, Rem, Sub};

use crate::consts;

pub fn round_down<T>(x: T, multiple: T) -> T
where
    T: Copy + Default + Rem<T, Output = T> + PartialEq + Sub<T, Output = T>,
{
    let rem = x % multiple;
    if rem == T::default() {
        x
    } else {
        x - rem
    }
}

pub fn round_up<T>(x: T, multiple: T) -> (/* x */ T, /* rem */ T)
where
    T: Add<T, Output = T> + Copy + Default + Rem<T, Output = T> + PartialEq + Sub<T, Output = T>,
{
    let zero = T::default();
    let rem = x % multiple;
    if rem == zero {
        (x, zero)
    } else {
        (x + (multiple - rem), rem)
    }
}

/// Rounds a requested class block size up to the allocator's alignment
pub fn align_block_size(size: usize) -> Option<usize> {
    let align = usize::from(consts::ALIGN_SIZE);
    size.checked_add(align - 1).map(|s| round_down(s, align))
}
