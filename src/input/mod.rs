pub mod expander;
pub mod line;
pub mod parser;

pub use expander::PidExpander;
pub use line::{EditorSource, LineSource, PlainSource};
pub use parser::{ParseError, ParsedCommand, Parser};
