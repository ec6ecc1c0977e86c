use super::*;
use crate::block::DEFAULT_BLOCK_SIZE;
use crate::common::error::CountError;
use crate::cpu::{self, CapabilityFlags};
use proptest::prelude::*;

/// Handles for every kernel this machine can run.
fn runnable() -> Vec<KernelHandle> {
    cpu::admissible_kernels(cpu::probe())
        .into_iter()
        .map(|k| KernelHandle::new(k).unwrap())
        .collect()
}

/// Zero-pad `data` up to a multiple of 32 bytes, the widest unit.
fn padded(data: &[u8]) -> Vec<u8> {
    let mut v = data.to_vec();
    let len = v.len().div_ceil(32) * 32;
    v.resize(len, 0);
    v
}

fn assert_all_kernels(data: &[u8], delimiter: u8, expected: u64) {
    let buf = padded(data);
    for h in runnable() {
        assert_eq!(
            h.count(&buf, delimiter),
            expected,
            "kernel {} on {:?}",
            h.kernel(),
            data
        );
    }
}

// ──────────────────────────────────────────────────
// Scenarios
// ──────────────────────────────────────────────────

#[test]
fn test_three_lines() {
    assert_all_kernels(b"a\nb\nc\n", b'\n', 3);
}

#[test]
fn test_full_block_without_delimiter() {
    assert_all_kernels(&[b'x'; DEFAULT_BLOCK_SIZE], b'\n', 0);
}

#[test]
fn test_full_block_of_delimiters() {
    assert_all_kernels(&[b'\n'; DEFAULT_BLOCK_SIZE], b'\n', DEFAULT_BLOCK_SIZE as u64);
}

#[test]
fn test_empty_buffer() {
    for h in runnable() {
        assert_eq!(h.count(&[], b'\n'), 0, "kernel {}", h.kernel());
    }
}

#[test]
fn test_all_zero_buffer() {
    assert_all_kernels(&[0u8; 64], b'\n', 0);
}

#[test]
fn test_crlf_counts_only_lf() {
    assert_all_kernels(b"one\r\ntwo\r\n\r", b'\n', 2);
}

#[test]
fn test_newline_followed_by_vertical_tab() {
    // 0x0B is '\n' ^ 0x01: after the XOR it is a 0x01 lane directly above a
    // zero lane, which the borrow-based zero-byte test miscounts
    assert_all_kernels(b"\n\x0B\n\x0B\n\x0B\n\x0B", b'\n', 4);
    assert_all_kernels(b"\x0B\n\x0B\x0B\n\n\x0B\x0B", b'\n', 3);
}

#[test]
fn test_high_bytes_do_not_match() {
    // 0x8A differs from '\n' only in the top bit
    assert_all_kernels(&[0x8A; 96], b'\n', 0);
    assert_all_kernels(&[0x8A, b'\n', 0x8A, 0xFF, b'\n', 0x80], b'\n', 2);
}

#[test]
fn test_other_delimiters() {
    assert_all_kernels(b"a,b,,c", b',', 3);
    assert_all_kernels(&[0xFF; 40], 0xFF, 40);
}

#[test]
fn test_nul_delimiter_counts_zero_bytes() {
    // Buffers handed in directly are counted in full, padding included
    let buf = [0u8; 32];
    for h in runnable() {
        assert_eq!(h.count(&buf, 0), 32, "kernel {}", h.kernel());
    }
}

#[test]
fn test_unpadded_buffers_count_every_byte() {
    // Lengths below and between unit widths leave a ragged tail
    for h in runnable() {
        assert_eq!(h.count(b"a\nb\nc\n", b'\n'), 3, "kernel {}", h.kernel());
        assert_eq!(h.count(b"\n", b'\n'), 1, "kernel {}", h.kernel());
        let mut data = vec![b'z'; 47];
        data[46] = b'\n';
        assert_eq!(h.count(&data, b'\n'), 1, "kernel {}", h.kernel());
    }
}

#[test]
fn test_every_lane_position() {
    // A single delimiter in each of the 32 lane positions of a register
    for pos in 0..32 {
        let mut data = [b'y'; 32];
        data[pos] = b'\n';
        assert_all_kernels(&data, b'\n', 1);
    }
}

// ──────────────────────────────────────────────────
// Kernel metadata
// ──────────────────────────────────────────────────

#[test]
fn test_units() {
    assert_eq!(Kernel::NAIVE.unit(), 1);
    assert_eq!(Kernel::SWAR.unit(), crate::popcount::WORD_BYTES);
    assert_eq!(Kernel::SSE2_POPCNT.unit(), 16);
    assert_eq!(Kernel::AVX2.unit(), 32);
    for k in Kernel::ALL {
        assert_eq!(DEFAULT_BLOCK_SIZE % k.unit(), 0, "{}", k);
    }
}

#[test]
fn test_names_round_trip_through_parse() {
    for k in Kernel::ALL {
        assert_eq!(parse_kernel(k.name()), Some(k));
        assert_eq!(k.name().parse::<Kernel>().unwrap(), k);
    }
    assert_eq!(parse_kernel("avx512"), None);
    let err = "avx512".parse::<Kernel>().unwrap_err();
    assert!(err.contains("avx2-popcnt"), "got: {}", err);
}

#[test]
fn test_display_is_name() {
    assert_eq!(Kernel::SSE2_POPCNT.to_string(), "sse2-popcnt");
    assert_eq!(Kernel::AVX2.label(), "SWAR AVX2 (no CPU POPCNT)");
}

#[test]
fn test_portable_kernels_always_supported() {
    assert!(Kernel::NAIVE.is_supported(CapabilityFlags::NONE));
    assert!(Kernel::SWAR.is_supported(CapabilityFlags::NONE));
    assert!(!Kernel::SWAR_POPCNT.is_supported(CapabilityFlags::NONE));
    assert!(!Kernel::SSE2.is_supported(CapabilityFlags::NONE));
    assert!(!Kernel::AVX2.is_supported(CapabilityFlags::NONE));
}

#[test]
fn test_popcnt_is_orthogonal_to_vector_width() {
    let f = CapabilityFlags {
        has_hardware_popcount: false,
        has_narrow_vector: true,
        has_wide_vector: true,
    };
    assert!(Kernel::AVX2.is_supported(f));
    assert!(!Kernel::AVX2_POPCNT.is_supported(f));
    assert!(!Kernel::SSE2_POPCNT.is_supported(f));
}

#[test]
fn test_handle_refuses_unsupported_kernel() {
    let flags = cpu::probe();
    for k in Kernel::ALL {
        match KernelHandle::new(k) {
            Ok(h) => {
                assert!(k.is_supported(flags));
                assert_eq!(h.kernel(), k);
            }
            Err(CountError::Unsupported { kernel }) => {
                assert_eq!(kernel, k);
                assert!(!k.is_supported(flags));
            }
            Err(e) => panic!("unexpected error: {}", e),
        }
    }
}

#[test]
fn test_portable_functions_directly() {
    assert_eq!(count_naive(b"a\nb\n", b'\n'), 2);
    assert_eq!(count_swar(&padded(b"a\nb\n"), b'\n'), 2);
    assert_eq!(count_swar(b"a\nb\n", b'\n'), 2);
}

// ──────────────────────────────────────────────────
// Cross-kernel equivalence
// ──────────────────────────────────────────────────

proptest! {
    #[test]
    fn prop_kernels_agree_with_naive(
        data in proptest::collection::vec(any::<u8>(), 0..600),
        delimiter in 1u8..=255,
    ) {
        let buf = padded(&data);
        let expected = count_naive(&data, delimiter);
        for h in runnable() {
            prop_assert_eq!(h.count(&buf, delimiter), expected, "kernel {}", h.kernel());
        }
    }

    #[test]
    fn prop_kernels_agree_on_unpadded_input(
        data in proptest::collection::vec(prop_oneof![Just(b'\n'), Just(0x0Bu8), any::<u8>()], 0..600),
        delimiter in any::<u8>(),
    ) {
        let expected = count_naive(&data, delimiter);
        for h in runnable() {
            prop_assert_eq!(h.count(&data, delimiter), expected, "kernel {}", h.kernel());
        }
    }

    #[test]
    fn prop_kernels_agree_on_newline_heavy_input(
        data in proptest::collection::vec(prop_oneof![Just(b'\n'), Just(0x0Bu8), Just(0x8Au8), Just(b'a')], 0..600),
    ) {
        let buf = padded(&data);
        let expected = count_naive(&data, b'\n');
        for h in runnable() {
            prop_assert_eq!(h.count(&buf, b'\n'), expected, "kernel {}", h.kernel());
        }
    }
}
