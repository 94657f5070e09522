use crate::config::PayloadFormat;
use crate::model::{ParserError, RawLevelRecord};
use csv::ReaderBuilder;
use serde_json::{Map, Value};

pub trait Parser: Send + Sync {
    fn parse(&self, payload: &str) -> Result<Vec<RawLevelRecord>, ParserError>;
}

/// Accepts `{"levels": [...]}` or a bare array of level objects.
pub struct JsonLevelParser;

/// Header row plus one level per line. Empty cells are treated as absent.
pub struct CsvLevelParser;

pub fn parser_for(format: PayloadFormat) -> Box<dyn Parser> {
    match format {
        PayloadFormat::Json => Box::new(JsonLevelParser),
        PayloadFormat::Csv => Box::new(CsvLevelParser),
    }
}

impl Parser for JsonLevelParser {
    fn parse(&self, payload: &str) -> Result<Vec<RawLevelRecord>, ParserError> {
        let document: Value = serde_json::from_str(payload)?;
        let items = match document {
            Value::Array(items) => items,
            Value::Object(mut root) => match root.remove("levels") {
                Some(Value::Array(items)) => items,
                Some(_) => {
                    return Err(ParserError::UnexpectedShape(
                        "\"levels\" is not an array".into(),
                    ));
                }
                None => {
                    return Err(ParserError::UnexpectedShape(
                        "object without a \"levels\" key".into(),
                    ));
                }
            },
            _ => {
                return Err(ParserError::UnexpectedShape(
                    "expected an array or an object".into(),
                ));
            }
        };

        items
            .into_iter()
            .map(|item| RawLevelRecord::from_value(item).map_err(ParserError::from))
            .collect()
    }
}

impl Parser for CsvLevelParser {
    fn parse(&self, payload: &str) -> Result<Vec<RawLevelRecord>, ParserError> {
        let mut reader = ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .trim(csv::Trim::Headers)
            .from_reader(payload.as_bytes());

        let headers = reader.headers()?.clone();
        let mut levels = Vec::new();

        for row in reader.records() {
            let row = row?;
            let mut fields = Map::new();
            for (header, cell) in headers.iter().zip(row.iter()) {
                if cell.is_empty() {
                    continue;
                }
                let value = if header == "tags" {
                    split_tags(cell)
                } else {
                    Value::String(cell.to_string())
                };
                fields.insert(header.to_string(), value);
            }
            levels.push(RawLevelRecord::new(fields));
        }

        Ok(levels)
    }
}

fn split_tags(cell: &str) -> Value {
    Value::Array(
        cell.split(',')
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .map(|t| Value::String(t.to_string()))
            .collect(),
    )
}
