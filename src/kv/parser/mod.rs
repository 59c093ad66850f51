pub mod core;
pub mod line_parser;
pub mod parse_value;

pub use core::{ChangeType, Parser, ParserConfig, ParserError};
pub use line_parser::{LineParser, LineParserConfig};
pub use parse_value::ParseValue;
