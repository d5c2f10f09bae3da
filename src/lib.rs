pub mod error;
pub mod flags;
pub mod logger;
pub mod shell;

pub mod core;
pub mod highlight;
pub mod input;
pub mod process;
