mod core;

#[cfg(test)]
mod tests;

pub use self::core::{CapabilityFlags, admissible_kernels, detect, probe, select_kernel};
