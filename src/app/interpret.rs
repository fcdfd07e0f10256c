//! Reading the upstream's reply: embedded business signal and diagnostic excerpt.

use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;

use crate::constants::{DETAIL_MAX_CHARS, NO_RESPONSE_BODY};
use crate::domain::ParsedSignal;

static WHITESPACE_RUN: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").unwrap());

/// Derive the business signal from a raw upstream body.
///
/// Only a JSON object whose `ok` is literally `false` is a failure. Anything
/// that is not a JSON object is `Unparseable`, which callers treat as neutral.
pub fn parse_signal(body: &str) -> ParsedSignal {
    let object = match serde_json::from_str::<Value>(body) {
        Ok(Value::Object(map)) => map,
        _ => return ParsedSignal::Unparseable,
    };

    match object.get("ok") {
        Some(Value::Bool(false)) => {
            let error = object.get("error").and_then(Value::as_str).map(str::to_string);
            ParsedSignal::ExplicitFailure(error)
        }
        _ => ParsedSignal::ExplicitOk,
    }
}

/// Bounded single-line excerpt of upstream output for the `detail` field.
///
/// Whitespace runs collapse to one space before the cut, so the result is at
/// most `DETAIL_MAX_CHARS` characters and never holds two adjacent spaces.
pub fn excerpt(text: Option<&str>) -> String {
    let text = match text.map(str::trim).filter(|t| !t.is_empty()) {
        Some(text) => text,
        None => return NO_RESPONSE_BODY.to_string(),
    };

    let collapsed = WHITESPACE_RUN.replace_all(text, " ");
    collapsed.chars().take(DETAIL_MAX_CHARS).collect::<String>().trim_end().to_string()
}
