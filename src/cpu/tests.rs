use super::*;
use crate::kernel::Kernel;

fn flags(popcnt: bool, narrow: bool, wide: bool) -> CapabilityFlags {
    CapabilityFlags {
        has_hardware_popcount: popcnt,
        has_narrow_vector: narrow,
        has_wide_vector: wide,
    }
}

// ──────────────────────────────────────────────────
// Dispatcher priority
// ──────────────────────────────────────────────────

#[test]
fn test_select_everything_available() {
    assert_eq!(select_kernel(flags(true, true, true)), Kernel::AVX2_POPCNT);
}

#[test]
fn test_select_narrow_with_popcnt() {
    assert_eq!(select_kernel(flags(true, true, false)), Kernel::SSE2_POPCNT);
}

#[test]
fn test_select_wide_without_popcnt_beats_narrow() {
    // No POPCNT: wide + portable count, not narrow + hardware count
    assert_eq!(select_kernel(flags(false, true, true)), Kernel::AVX2);
}

#[test]
fn test_select_narrow_without_popcnt() {
    assert_eq!(select_kernel(flags(false, true, false)), Kernel::SSE2);
}

#[test]
fn test_select_wide_only_popcnt_missing() {
    assert_eq!(select_kernel(flags(false, false, true)), Kernel::AVX2);
}

#[test]
fn test_select_popcnt_only_falls_back_to_swar() {
    assert_eq!(select_kernel(flags(true, false, false)), Kernel::SWAR);
}

#[test]
fn test_select_nothing_available() {
    assert_eq!(select_kernel(CapabilityFlags::NONE), Kernel::SWAR);
}

#[test]
fn test_selected_kernel_always_supported() {
    for bits in 0..8u8 {
        let f = flags(bits & 1 != 0, bits & 2 != 0, bits & 4 != 0);
        let k = select_kernel(f);
        assert!(k.is_supported(f), "{} selected for {}", k, f);
    }
}

#[test]
fn test_select_is_const() {
    const K: Kernel = select_kernel(CapabilityFlags::NONE);
    assert_eq!(K, Kernel::SWAR);
}

// ──────────────────────────────────────────────────
// Admissible kernel lists
// ──────────────────────────────────────────────────

#[test]
fn test_admissible_none() {
    assert_eq!(
        admissible_kernels(CapabilityFlags::NONE),
        vec![Kernel::SWAR, Kernel::NAIVE]
    );
}

#[test]
fn test_admissible_all() {
    assert_eq!(admissible_kernels(flags(true, true, true)), Kernel::ALL.to_vec());
}

#[test]
fn test_admissible_starts_with_selected() {
    for bits in 0..8u8 {
        let f = flags(bits & 1 != 0, bits & 2 != 0, bits & 4 != 0);
        assert_eq!(admissible_kernels(f)[0], select_kernel(f));
    }
}

// ──────────────────────────────────────────────────
// Probe
// ──────────────────────────────────────────────────

#[test]
fn test_probe_is_cached_and_matches_detect() {
    let first = probe();
    assert_eq!(first, probe());
    assert_eq!(first, detect());
}

#[cfg(target_arch = "x86_64")]
#[test]
fn test_probe_x86_64_has_sse2() {
    // SSE2 is part of the x86_64 baseline
    assert!(probe().has_narrow_vector);
}

#[test]
fn test_flags_display() {
    assert_eq!(
        flags(true, false, true).to_string(),
        "popcnt=yes narrow-vector=no wide-vector=yes"
    );
}
