use std::fmt;
use std::str::FromStr;

use crate::common::error::CountError;
use crate::cpu::{self, CapabilityFlags};
use crate::popcount::{WORD_BYTES, Word, count_set_bits, splat};

/// How a kernel walks the buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Strategy {
    /// One byte per step.
    Naive,
    /// One native word per step (SIMD within a register).
    Swar,
    /// One 128-bit register per step (SSE2).
    NarrowVector,
    /// One 256-bit register per step (AVX2).
    WideVector,
}

/// Where the population count of a match mask comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PopcountSource {
    /// The CPU's POPCNT instruction.
    Hardware,
    /// `popcount::count_set_bits*`.
    Scalar,
}

/// A counting strategy paired with a popcount source.
///
/// Every kernel returns the same count for the same buffer; which one runs
/// is purely a throughput decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Kernel {
    pub strategy: Strategy,
    pub popcount: PopcountSource,
}

impl Kernel {
    pub const NAIVE: Kernel = Kernel::new(Strategy::Naive, PopcountSource::Scalar);
    pub const SWAR: Kernel = Kernel::new(Strategy::Swar, PopcountSource::Scalar);
    pub const SWAR_POPCNT: Kernel = Kernel::new(Strategy::Swar, PopcountSource::Hardware);
    pub const SSE2: Kernel = Kernel::new(Strategy::NarrowVector, PopcountSource::Scalar);
    pub const SSE2_POPCNT: Kernel = Kernel::new(Strategy::NarrowVector, PopcountSource::Hardware);
    pub const AVX2: Kernel = Kernel::new(Strategy::WideVector, PopcountSource::Scalar);
    pub const AVX2_POPCNT: Kernel = Kernel::new(Strategy::WideVector, PopcountSource::Hardware);

    /// Every kernel, fastest first. The first five are the dispatcher's
    /// candidates in priority order.
    pub const ALL: [Kernel; 7] = [
        Kernel::AVX2_POPCNT,
        Kernel::SSE2_POPCNT,
        Kernel::AVX2,
        Kernel::SSE2,
        Kernel::SWAR,
        Kernel::SWAR_POPCNT,
        Kernel::NAIVE,
    ];

    pub const fn new(strategy: Strategy, popcount: PopcountSource) -> Self {
        Kernel { strategy, popcount }
    }

    /// Short machine name, accepted by `parse_kernel`.
    pub fn name(self) -> &'static str {
        match (self.strategy, self.popcount) {
            (Strategy::Naive, _) => "naive",
            (Strategy::Swar, PopcountSource::Scalar) => "swar",
            (Strategy::Swar, PopcountSource::Hardware) => "swar-popcnt",
            (Strategy::NarrowVector, PopcountSource::Scalar) => "sse2",
            (Strategy::NarrowVector, PopcountSource::Hardware) => "sse2-popcnt",
            (Strategy::WideVector, PopcountSource::Scalar) => "avx2",
            (Strategy::WideVector, PopcountSource::Hardware) => "avx2-popcnt",
        }
    }

    /// Human label used by the benchmark report.
    pub fn label(self) -> &'static str {
        match (self.strategy, self.popcount) {
            (Strategy::Naive, _) => "naive byte loop",
            (Strategy::Swar, PopcountSource::Scalar) => "block read",
            (Strategy::Swar, PopcountSource::Hardware) => "block read (CPU POPCNT)",
            (Strategy::NarrowVector, PopcountSource::Scalar) => "SWAR SSE2 (no CPU POPCNT)",
            (Strategy::NarrowVector, PopcountSource::Hardware) => "SWAR SSE2",
            (Strategy::WideVector, PopcountSource::Scalar) => "SWAR AVX2 (no CPU POPCNT)",
            (Strategy::WideVector, PopcountSource::Hardware) => "SWAR AVX2",
        }
    }

    /// Bytes consumed per step. The block size must be a multiple of this.
    pub const fn unit(self) -> usize {
        match self.strategy {
            Strategy::Naive => 1,
            Strategy::Swar => WORD_BYTES,
            Strategy::NarrowVector => 16,
            Strategy::WideVector => 32,
        }
    }

    /// Whether a CPU with `flags` can execute this kernel.
    pub const fn is_supported(self, flags: CapabilityFlags) -> bool {
        let vector_ok = match self.strategy {
            Strategy::Naive | Strategy::Swar => true,
            Strategy::NarrowVector => flags.has_narrow_vector,
            Strategy::WideVector => flags.has_wide_vector,
        };
        let popcount_ok = match self.popcount {
            PopcountSource::Scalar => true,
            PopcountSource::Hardware => {
                flags.has_hardware_popcount || matches!(self.strategy, Strategy::Naive)
            }
        };
        vector_ok && popcount_ok
    }
}

impl fmt::Display for Kernel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Kernel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse_kernel(s).ok_or_else(|| {
            let names: Vec<&str> = Kernel::ALL.iter().map(|k| k.name()).collect();
            format!("unknown kernel '{}' (expected one of: {})", s, names.join(", "))
        })
    }
}

/// Look a kernel up by its `name()`.
pub fn parse_kernel(name: &str) -> Option<Kernel> {
    Kernel::ALL.into_iter().find(|k| k.name() == name)
}

type CountFn = fn(&[u8], u8) -> u64;

/// A kernel resolved to its implementation for the running CPU.
///
/// Holding one proves the CPU can execute the kernel, so `count` is safe to
/// call in the hot loop with no further capability checks.
#[derive(Clone, Copy)]
pub struct KernelHandle {
    kernel: Kernel,
    count: CountFn,
}

impl fmt::Debug for KernelHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("KernelHandle").field(&self.kernel).finish()
    }
}

impl KernelHandle {
    /// Resolve `kernel` against the real CPU capabilities.
    pub fn new(kernel: Kernel) -> Result<Self, CountError> {
        if !kernel.is_supported(cpu::probe()) {
            return Err(CountError::Unsupported { kernel });
        }
        let count = implementation(kernel).ok_or(CountError::Unsupported { kernel })?;
        Ok(KernelHandle { kernel, count })
    }

    #[inline]
    pub fn kernel(&self) -> Kernel {
        self.kernel
    }

    /// Count `delimiter` bytes in `buf`.
    ///
    /// Any length is accepted. Bytes past the last whole `kernel().unit()`
    /// are compared one at a time, so the engine keeps its blocks a multiple
    /// of the unit to stay on the fast path.
    #[inline]
    pub fn count(&self, buf: &[u8], delimiter: u8) -> u64 {
        (self.count)(buf, delimiter)
    }
}

fn implementation(kernel: Kernel) -> Option<CountFn> {
    match (kernel.strategy, kernel.popcount) {
        (Strategy::Naive, _) => Some(count_naive),
        (Strategy::Swar, PopcountSource::Scalar) => Some(count_swar),
        #[cfg(any(target_arch = "x86", target_arch = "x86_64"))]
        (Strategy::Swar, PopcountSource::Hardware) => Some(super::x86::swar_popcnt),
        #[cfg(target_arch = "aarch64")]
        (Strategy::Swar, PopcountSource::Hardware) => Some(count_swar_cnt),
        #[cfg(any(target_arch = "x86", target_arch = "x86_64"))]
        (Strategy::NarrowVector, PopcountSource::Scalar) => Some(super::x86::sse2),
        #[cfg(any(target_arch = "x86", target_arch = "x86_64"))]
        (Strategy::NarrowVector, PopcountSource::Hardware) => Some(super::x86::sse2_popcnt),
        #[cfg(any(target_arch = "x86", target_arch = "x86_64"))]
        (Strategy::WideVector, PopcountSource::Scalar) => Some(super::x86::avx2),
        #[cfg(any(target_arch = "x86", target_arch = "x86_64"))]
        (Strategy::WideVector, PopcountSource::Hardware) => Some(super::x86::avx2_popcnt),
        #[allow(unreachable_patterns)]
        _ => None,
    }
}

/// Byte-at-a-time count. The reference every other kernel is tested against.
pub fn count_naive(buf: &[u8], delimiter: u8) -> u64 {
    buf.iter().filter(|&&b| b == delimiter).count() as u64
}

/// Word-at-a-time count with the portable popcount.
pub fn count_swar(buf: &[u8], delimiter: u8) -> u64 {
    swar(buf, delimiter, count_set_bits)
}

/// SWAR with `count_ones`, which is a single CNT on aarch64.
#[cfg(target_arch = "aarch64")]
fn count_swar_cnt(buf: &[u8], delimiter: u8) -> u64 {
    swar(buf, delimiter, Word::count_ones)
}

/// SWAR body shared by the scalar and hardware popcount variants.
///
/// After XOR with the splatted delimiter a matching lane is zero. The test
/// `!(((x & 0x7F..) + 0x7F..) | x | 0x7F..)` leaves exactly one bit, the top
/// bit, in every zero lane and nothing elsewhere. The sum per lane is at most
/// 0xFE, so no carry crosses into the next lane. The borrow form
/// `(x - 0x01..) & !x & 0x80..` would also flag a 0x01 lane above a zero lane.
#[inline(always)]
pub(super) fn swar(buf: &[u8], delimiter: u8, popcount: impl Fn(Word) -> u32) -> u64 {
    let needle = splat(delimiter);
    let low7 = splat(0x7F);

    let chunks = buf.chunks_exact(WORD_BYTES);
    let tail = chunks.remainder();
    let mut total = 0u64;
    let mut lane = [0u8; WORD_BYTES];
    for chunk in chunks {
        lane.copy_from_slice(chunk);
        let x = Word::from_ne_bytes(lane) ^ needle;
        let nonzero = ((x & low7) + low7) | x;
        total += popcount(!(nonzero | low7)) as u64;
    }
    total + count_naive(tail, delimiter)
}
