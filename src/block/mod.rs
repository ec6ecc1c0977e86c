mod core;


pub use self::core::{BlockBuffer, BlockRead, DEFAULT_BLOCK_SIZE, pad_byte_for, read_block};
