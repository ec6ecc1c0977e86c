use std::fmt;
use std::sync::OnceLock;

use crate::kernel::Kernel;

/// Instruction-set tiers the counting kernels care about.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct CapabilityFlags {
    /// POPCNT (x86) / CNT (aarch64).
    pub has_hardware_popcount: bool,
    /// 128-bit integer vectors (SSE2).
    pub has_narrow_vector: bool,
    /// 256-bit integer vectors (AVX2).
    pub has_wide_vector: bool,
}

impl CapabilityFlags {
    /// A CPU with none of the optional tiers. Only the portable kernels run.
    pub const NONE: CapabilityFlags = CapabilityFlags {
        has_hardware_popcount: false,
        has_narrow_vector: false,
        has_wide_vector: false,
    };
}

impl fmt::Display for CapabilityFlags {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let yn = |b: bool| if b { "yes" } else { "no" };
        write!(
            f,
            "popcnt={} narrow-vector={} wide-vector={}",
            yn(self.has_hardware_popcount),
            yn(self.has_narrow_vector),
            yn(self.has_wide_vector)
        )
    }
}

static CAPABILITIES: OnceLock<CapabilityFlags> = OnceLock::new();

/// Capabilities of the running CPU, detected on first call and cached for
/// the life of the process.
#[inline]
pub fn probe() -> CapabilityFlags {
    *CAPABILITIES.get_or_init(|| {
        let flags = detect();
        log::debug!("cpu capabilities: {}", flags);
        flags
    })
}

/// Query the CPU directly, bypassing the cache.
pub fn detect() -> CapabilityFlags {
    #[cfg(any(target_arch = "x86", target_arch = "x86_64"))]
    {
        CapabilityFlags {
            has_hardware_popcount: is_x86_feature_detected!("popcnt"),
            has_narrow_vector: is_x86_feature_detected!("sse2"),
            has_wide_vector: is_x86_feature_detected!("avx2"),
        }
    }

    #[cfg(target_arch = "aarch64")]
    {
        // CNT is part of the base AArch64 SIMD set; no vector kernels exist here
        CapabilityFlags {
            has_hardware_popcount: std::arch::is_aarch64_feature_detected!("neon"),
            ..CapabilityFlags::NONE
        }
    }

    #[cfg(not(any(target_arch = "x86", target_arch = "x86_64", target_arch = "aarch64")))]
    {
        CapabilityFlags::NONE
    }
}

/// Pick the fastest kernel `flags` admit.
///
/// ```text
/// Priority  Kernel                 Requirement
/// ────────  ─────────────────────  ──────────────────────────
/// 1         AVX2 + POPCNT          wide vector, hw popcount
/// 2         SSE2 + POPCNT          narrow vector, hw popcount
/// 3         AVX2 + portable count  wide vector
/// 4         SSE2 + portable count  narrow vector
/// 5         SWAR + portable count  always
/// ```
pub const fn select_kernel(flags: CapabilityFlags) -> Kernel {
    if flags.has_wide_vector && flags.has_hardware_popcount {
        Kernel::AVX2_POPCNT
    } else if flags.has_narrow_vector && flags.has_hardware_popcount {
        Kernel::SSE2_POPCNT
    } else if flags.has_wide_vector {
        Kernel::AVX2
    } else if flags.has_narrow_vector {
        Kernel::SSE2
    } else {
        Kernel::SWAR
    }
}

/// Every kernel `flags` admit, in `Kernel::ALL` order.
pub fn admissible_kernels(flags: CapabilityFlags) -> Vec<Kernel> {
    Kernel::ALL
        .into_iter()
        .filter(|k| k.is_supported(flags))
        .collect()
}
