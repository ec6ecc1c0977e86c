#![allow(clippy::len_without_is_empty)]

/// Use mimalloc as the global allocator for the library and its binary.
/// The engine allocates one block buffer per call, so the allocator is
/// mostly exercised by the benchmark harness and tests.
#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

pub mod block;
pub mod common;
pub mod cpu;
pub mod engine;
pub mod kernel;
pub mod popcount;

pub use crate::common::error::CountError;
pub use crate::cpu::{CapabilityFlags, probe, select_kernel};
pub use crate::engine::{Engine, EngineConfig, count_file, count_lines};
pub use crate::kernel::{Kernel, PopcountSource, Strategy};
