mod core;
#[cfg(any(target_arch = "x86", target_arch = "x86_64"))]
mod x86;

#[cfg(test)]
mod tests;

pub use self::core::{
    Kernel, KernelHandle, PopcountSource, Strategy, count_naive, count_swar, parse_kernel,
};
