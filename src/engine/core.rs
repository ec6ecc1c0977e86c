use std::io::Read;
use std::path::Path;

use crate::block::{BlockBuffer, DEFAULT_BLOCK_SIZE, pad_byte_for, read_block};
use crate::common::error::CountError;
use crate::common::io::{open_noatime, page_size};
use crate::cpu::{self, CapabilityFlags};
use crate::kernel::{Kernel, KernelHandle};

/// Knobs the engine accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EngineConfig {
    /// Bytes per read. Must be a multiple of the kernel's unit width.
    pub block_size: usize,
    /// Byte being counted.
    pub delimiter: u8,
}

impl Default for EngineConfig {
    fn default() -> Self {
        EngineConfig {
            block_size: DEFAULT_BLOCK_SIZE,
            delimiter: b'\n',
        }
    }
}

impl EngineConfig {
    /// Newline counting with one host memory page per read.
    pub fn page_sized() -> Self {
        EngineConfig {
            block_size: page_size(),
            ..Default::default()
        }
    }

    pub fn with_delimiter(mut self, delimiter: u8) -> Self {
        self.delimiter = delimiter;
        self
    }

    pub fn with_block_size(mut self, block_size: usize) -> Self {
        self.block_size = block_size;
        self
    }

    /// Reject block sizes the kernel cannot stride over.
    pub fn validate(&self, kernel: Kernel) -> Result<(), CountError> {
        let unit = kernel.unit();
        if self.block_size == 0 || self.block_size % unit != 0 {
            return Err(CountError::Configuration {
                block_size: self.block_size,
                unit,
            });
        }
        Ok(())
    }
}

/// A kernel bound to a validated configuration.
///
/// Building an engine does the capability probe, dispatch and validation
/// once; each `count_*` call then owns its own buffer and running total.
#[derive(Debug, Clone, Copy)]
pub struct Engine {
    handle: KernelHandle,
    config: EngineConfig,
}

impl Engine {
    /// Engine running the fastest kernel this CPU supports.
    pub fn new(config: EngineConfig) -> Result<Self, CountError> {
        Engine::with_capabilities(cpu::probe(), config)
    }

    /// Engine running the kernel the dispatcher picks for `flags`.
    ///
    /// The handle is still checked against the real CPU, so flags claiming
    /// more than the host has yield `Unsupported` rather than a faulting kernel.
    pub fn with_capabilities(
        flags: CapabilityFlags,
        config: EngineConfig,
    ) -> Result<Self, CountError> {
        let kernel = cpu::select_kernel(flags);
        log::debug!("selected kernel {} for {}", kernel, flags);
        Engine::with_kernel(kernel, config)
    }

    /// Engine running `kernel`, or `Unsupported` if this CPU cannot.
    pub fn with_kernel(kernel: Kernel, config: EngineConfig) -> Result<Self, CountError> {
        config.validate(kernel)?;
        let handle = KernelHandle::new(kernel)?;
        log::debug!(
            "engine: kernel={} block_size={} delimiter={:#04x}",
            kernel,
            config.block_size,
            config.delimiter
        );
        Ok(Engine { handle, config })
    }

    #[inline]
    pub fn kernel(&self) -> Kernel {
        self.handle.kernel()
    }

    #[inline]
    pub fn config(&self) -> EngineConfig {
        self.config
    }

    /// Count delimiters in everything `reader` yields.
    ///
    /// Fails atomically: a read error discards the partial total.
    pub fn count_reader<R: Read>(&self, mut reader: R) -> Result<u64, CountError> {
        let delimiter = self.config.delimiter;
        let mut buf = BlockBuffer::new(
            self.config.block_size,
            self.kernel().unit(),
            pad_byte_for(delimiter),
        )?;

        let mut total = 0u64;
        let mut blocks = 0u64;
        loop {
            let block = read_block(&mut reader, &mut buf)?;
            if block.bytes_read > 0 {
                total += self.handle.count(buf.as_bytes(), delimiter);
                blocks += 1;
            }
            if block.is_final {
                break;
            }
        }
        log::trace!(
            "{}: {} delimiters in {} blocks",
            self.kernel(),
            total,
            blocks
        );
        Ok(total)
    }

    /// Open `path` read-only and count its delimiters.
    pub fn count_path(&self, path: &Path) -> Result<u64, CountError> {
        let file = open_noatime(path).map_err(|e| CountError::from_open(path, e))?;
        self.count_reader(file)
    }
}

/// Count `delimiter` bytes in `reader` with the dispatched kernel and
/// default block size.
///
/// Callers holding their own `CapabilityFlags` use
/// `Engine::with_capabilities(flags, config)?.count_reader(reader)`.
pub fn count_lines<R: Read>(reader: R, delimiter: u8) -> Result<u64, CountError> {
    Engine::new(EngineConfig::default().with_delimiter(delimiter))?.count_reader(reader)
}

/// Count `delimiter` bytes in the file at `path`.
pub fn count_file(path: &Path, delimiter: u8) -> Result<u64, CountError> {
    Engine::new(EngineConfig::default().with_delimiter(delimiter))?.count_path(path)
}
