//! Best-effort recovery of a JSON payload from free-form model output.
//!
//! Models are told to answer with bare JSON but still wrap it in code fences or
//! explanatory prose. The scan tries every opening bracket left to right and keeps
//! the first one that parses as a complete JSON value; anything after that value is
//! ignored. First match wins.

use serde_json::{Map, Value};

/// Which literal a caller expects at the top level.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Literal {
    Array,
    Object,
}

impl Literal {
    fn open(self) -> char {
        match self {
            Literal::Array => '[',
            Literal::Object => '{',
        }
    }

    fn other(self) -> Self {
        match self {
            Literal::Array => Literal::Object,
            Literal::Object => Literal::Array,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Extracted {
    Array(Vec<Value>),
    Object(Map<String, Value>),
    Nothing,
}

/// Finds the first well-formed `preferred` literal; falls back to the first
/// well-formed literal of the other kind.
pub fn extract_json(text: &str, preferred: Literal) -> Extracted {
    first_literal(text, preferred)
        .or_else(|| first_literal(text, preferred.other()))
        .unwrap_or(Extracted::Nothing)
}

fn first_literal(text: &str, kind: Literal) -> Option<Extracted> {
    let open = kind.open();
    text.char_indices()
        .filter(|(_, c)| *c == open)
        .find_map(|(start, _)| parse_value_at(&text[start..]))
}

/// Parses one JSON value from the start of `tail`, ignoring whatever follows it.
fn parse_value_at(tail: &str) -> Option<Extracted> {
    let mut values = serde_json::Deserializer::from_str(tail).into_iter::<Value>();
    match values.next() {
        Some(Ok(Value::Array(items))) => Some(Extracted::Array(items)),
        Some(Ok(Value::Object(map))) => Some(Extracted::Object(map)),
        _ => None,
    }
}
