mod core;


pub use self::core::{Engine, EngineConfig, count_file, count_lines};
