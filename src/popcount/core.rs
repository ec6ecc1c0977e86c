/// Native machine word the SWAR kernel is written against.
#[cfg(target_pointer_width = "64")]
pub type Word = u64;

/// Native machine word the SWAR kernel is written against.
#[cfg(not(target_pointer_width = "64"))]
pub type Word = u32;

/// Size of `Word` in bytes.
pub const WORD_BYTES: usize = std::mem::size_of::<Word>();

/// Replicate a byte into every byte lane of a `Word`.
#[inline(always)]
pub const fn splat(byte: u8) -> Word {
    (Word::MAX / 0xFF) * byte as Word
}

/// Portable population count for a 64-bit value.
///
/// Sums bits pairwise, then per nibble, then folds the eight byte sums
/// into the top byte with a multiply by 0x0101..01.
#[inline(always)]
pub const fn count_set_bits_u64(mut x: u64) -> u32 {
    x = x - ((x >> 1) & 0x5555_5555_5555_5555);
    x = (x & 0x3333_3333_3333_3333) + ((x >> 2) & 0x3333_3333_3333_3333);
    ((((x + (x >> 4)) & 0x0F0F_0F0F_0F0F_0F0F).wrapping_mul(0x0101_0101_0101_0101)) >> 56) as u32
}

/// Portable population count for a 32-bit value. Used on vector movemasks.
#[inline(always)]
pub const fn count_set_bits_u32(mut x: u32) -> u32 {
    x = x - ((x >> 1) & 0x5555_5555);
    x = (x & 0x3333_3333) + ((x >> 2) & 0x3333_3333);
    (((x + (x >> 4)) & 0x0F0F_0F0F).wrapping_mul(0x0101_0101)) >> 24
}

/// Portable population count for a native `Word`.
#[inline(always)]
pub const fn count_set_bits(x: Word) -> u32 {
    #[cfg(target_pointer_width = "64")]
    {
        count_set_bits_u64(x)
    }
    #[cfg(not(target_pointer_width = "64"))]
    {
        count_set_bits_u32(x)
    }
}
