// Payload decoding: turns a fetched body into raw level records.

pub mod level_parser;

pub use level_parser::{parser_for, CsvLevelParser, JsonLevelParser, Parser};
