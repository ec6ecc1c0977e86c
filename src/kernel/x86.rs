//! SSE2 / AVX2 counting kernels.
//!
//! Each register is XORed with the splatted delimiter, so matching lanes
//! become zero. `(x - 0x01) & !x & 0x80` then sets the high bit of exactly
//! the zero lanes (the subtraction is per byte, so no borrow leaks into the
//! neighbouring lane) and `movemask` packs those bits into an integer whose
//! population count is the number of matches in the register. Bytes after
//! the last whole register are compared one at a time.

#[cfg(target_arch = "x86")]
use std::arch::x86::*;
#[cfg(target_arch = "x86_64")]
use std::arch::x86_64::*;

use crate::popcount::{Word, count_set_bits_u32};

macro_rules! vector_kernel {
    (
        $(#[$attr:meta])*
        fn $name:ident,
        features: $features:literal,
        width: $width:literal,
        vector: $vec:ty,
        set1: $set1:ident,
        load: $load:ident,
        xor: $xor:ident,
        and: $and:ident,
        andnot: $andnot:ident,
        sub: $sub:ident,
        movemask: $movemask:ident,
        popcount: $popcount:path
    ) => {
        $(#[$attr])*
        #[target_feature(enable = $features)]
        pub(super) unsafe fn $name(buf: &[u8], delimiter: u8) -> u64 {
            unsafe {
                let needle = $set1(delimiter as i8);
                let ones = $set1(0x01);
                let high = $set1(0x80u8 as i8);

                let lanes = buf.chunks_exact($width);
                let tail = lanes.remainder();
                let mut total = 0u64;
                for lane in lanes {
                    let v = $load(lane.as_ptr() as *const $vec);
                    let x = $xor(v, needle);
                    let hits = $and($sub(x, ones), $andnot(x, high));
                    total += $popcount($movemask(hits) as u32) as u64;
                }
                total + super::core::count_naive(tail, delimiter)
            }
        }
    };
}

vector_kernel! {
    /// 16 lanes per step, portable popcount on the mask.
    fn count_sse2,
    features: "sse2",
    width: 16,
    vector: __m128i,
    set1: _mm_set1_epi8,
    load: _mm_loadu_si128,
    xor: _mm_xor_si128,
    and: _mm_and_si128,
    andnot: _mm_andnot_si128,
    sub: _mm_sub_epi8,
    movemask: _mm_movemask_epi8,
    popcount: count_set_bits_u32
}

vector_kernel! {
    /// 16 lanes per step, POPCNT on the mask.
    fn count_sse2_popcnt,
    features: "sse2,popcnt",
    width: 16,
    vector: __m128i,
    set1: _mm_set1_epi8,
    load: _mm_loadu_si128,
    xor: _mm_xor_si128,
    and: _mm_and_si128,
    andnot: _mm_andnot_si128,
    sub: _mm_sub_epi8,
    movemask: _mm_movemask_epi8,
    popcount: u32::count_ones
}

vector_kernel! {
    /// 32 lanes per step, portable popcount on the mask.
    fn count_avx2,
    features: "avx2",
    width: 32,
    vector: __m256i,
    set1: _mm256_set1_epi8,
    load: _mm256_loadu_si256,
    xor: _mm256_xor_si256,
    and: _mm256_and_si256,
    andnot: _mm256_andnot_si256,
    sub: _mm256_sub_epi8,
    movemask: _mm256_movemask_epi8,
    popcount: count_set_bits_u32
}

vector_kernel! {
    /// 32 lanes per step, POPCNT on the mask.
    fn count_avx2_popcnt,
    features: "avx2,popcnt",
    width: 32,
    vector: __m256i,
    set1: _mm256_set1_epi8,
    load: _mm256_loadu_si256,
    xor: _mm256_xor_si256,
    and: _mm256_and_si256,
    andnot: _mm256_andnot_si256,
    sub: _mm256_sub_epi8,
    movemask: _mm256_movemask_epi8,
    popcount: u32::count_ones
}

/// SWAR over native words with `count_ones` lowered to POPCNT.
#[target_feature(enable = "popcnt")]
pub(super) unsafe fn count_swar_popcnt(buf: &[u8], delimiter: u8) -> u64 {
    super::core::swar(buf, delimiter, Word::count_ones)
}

// Safe entry points for the dispatch table. `KernelHandle::new` is the only
// place these are handed out, and it refuses kernels the probe did not admit.

pub(super) fn sse2(buf: &[u8], delimiter: u8) -> u64 {
    // SAFETY: sse2 confirmed by cpu::probe before this pointer escapes
    unsafe { count_sse2(buf, delimiter) }
}

pub(super) fn sse2_popcnt(buf: &[u8], delimiter: u8) -> u64 {
    // SAFETY: sse2 and popcnt confirmed by cpu::probe
    unsafe { count_sse2_popcnt(buf, delimiter) }
}

pub(super) fn avx2(buf: &[u8], delimiter: u8) -> u64 {
    // SAFETY: avx2 confirmed by cpu::probe
    unsafe { count_avx2(buf, delimiter) }
}

pub(super) fn avx2_popcnt(buf: &[u8], delimiter: u8) -> u64 {
    // SAFETY: avx2 and popcnt confirmed by cpu::probe
    unsafe { count_avx2_popcnt(buf, delimiter) }
}

pub(super) fn swar_popcnt(buf: &[u8], delimiter: u8) -> u64 {
    // SAFETY: popcnt confirmed by cpu::probe
    unsafe { count_swar_popcnt(buf, delimiter) }
}
