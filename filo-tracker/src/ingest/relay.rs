//! Chat relay message parsing
//!
//! Relay bots forward sightings as chat text. Two shapes are accepted:
//! a JSON object, or `key=value` pairs separated by whitespace, `;` or
//! newlines. Values may contain spaces (`target=Funa Yurei world=Mateus`);
//! a word without `=` continues the previous value.

use serde_json::Value;

use super::RawReport;
use crate::error::{TrackerError, TrackerResult};

/// Parse a relay message into a raw report map
pub fn parse_relay_text(text: &str) -> TrackerResult<RawReport> {
    let text = text.trim();
    if text.is_empty() {
        return Err(TrackerError::MalformedReport("empty relay message".to_string()));
    }

    if text.starts_with('{') {
        return serde_json::from_str::<RawReport>(text)
            .map_err(|e| TrackerError::MalformedReport(format!("relay JSON: {}", e)));
    }

    let mut map = RawReport::new();
    for segment in text.split(|c| c == ';' || c == '\n') {
        let mut current: Option<(String, String)> = None;
        for word in segment.split_whitespace() {
            match word.split_once('=') {
                Some((key, value)) if !key.is_empty() => {
                    if let Some((k, v)) = current.take() {
                        map.insert(k, Value::String(v));
                    }
                    current = Some((key.to_string(), value.to_string()));
                }
                _ => match current.as_mut() {
                    Some((_, v)) => {
                        if !v.is_empty() {
                            v.push(' ');
                        }
                        v.push_str(word);
                    }
                    None => {
                        return Err(TrackerError::MalformedReport(format!(
                            "relay token without key: {}",
                            word
                        )))
                    }
                },
            }
        }
        if let Some((k, v)) = current {
            map.insert(k, Value::String(v));
        }
    }

    if map.is_empty() {
        return Err(TrackerError::MalformedReport("no fields in relay message".to_string()));
    }
    Ok(map)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_value_message() {
        let map = parse_relay_text("target=Funa Yurei world=Mateus; instance=2\ncoords=10.5,12.2").unwrap();
        assert_eq!(map["target"], "Funa Yurei");
        assert_eq!(map["world"], "Mateus");
        assert_eq!(map["instance"], "2");
        assert_eq!(map["coords"], "10.5,12.2");
    }

    #[test]
    fn test_json_message() {
        let map = parse_relay_text(r#"{"target": "Erle", "world": "Mateus", "coords": [10, 10]}"#).unwrap();
        assert_eq!(map["target"], "Erle");
        assert!(map["coords"].is_array());
    }

    #[test]
    fn test_rejects_garbage() {
        assert!(parse_relay_text("   ").is_err());
        assert!(parse_relay_text("hello there").is_err());
        assert!(parse_relay_text("{not json").is_err());
    }
}
