//! Payload extraction from raw model text.
//!
//! Models often wrap their answer in markdown fences or add a sentence of
//! preamble. JSON stages parse the text directly first and fall back to the
//! content of a fenced block; code stages take the first fenced block or the
//! whole text.

use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;

static JSON_FENCE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?s)```json[ \t]*\r?\n?(.*?)```").unwrap());

static PYTHON_FENCE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)```(?:python|py)[ \t]*\r?\n?(.*?)```").unwrap());

static ANY_FENCE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)```[A-Za-z0-9_+-]*[ \t]*\r?\n?(.*?)```").unwrap());

/// Parse a JSON payload out of `raw`.
///
/// Order: the whole trimmed text, then a ```` ```json ```` block, then any
/// fenced block. The error names the direct-parse failure since that is what
/// the model was asked to produce.
pub fn extract_json(raw: &str) -> Result<Value, String> {
    let trimmed = raw.trim();
    let direct = match serde_json::from_str::<Value>(trimmed) {
        Ok(value) => return Ok(value),
        Err(e) => e,
    };

    for fence in [&*JSON_FENCE, &*ANY_FENCE] {
        if let Some(caps) = fence.captures(trimmed)
            && let Ok(value) = serde_json::from_str::<Value>(caps[1].trim())
        {
            return Ok(value);
        }
    }

    Err(format!("Invalid JSON: {direct}"))
}

/// Script text out of `raw`: the first python fence, else the first fence
/// of any kind, else the trimmed text unmodified.
#[must_use]
pub fn extract_code(raw: &str) -> String {
    for fence in [&*PYTHON_FENCE, &*ANY_FENCE] {
        if let Some(caps) = fence.captures(raw) {
            return caps[1].trim().to_string();
        }
    }
    raw.trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_direct_json() {
        let value = extract_json(r#"  {"concept": "Limits", "steps": ["a"]}  "#).unwrap();
        assert_eq!(value["concept"], "Limits");
    }

    #[test]
    fn test_json_fenced_block() {
        let raw = "Here you go:\n```json\n{\"scenes\": []}\n```\nEnjoy!";
        let value = extract_json(raw).unwrap();
        assert!(value["scenes"].as_array().unwrap().is_empty());
    }

    #[test]
    fn test_generic_fenced_json() {
        let raw = "```\n{\"narrations\": []}\n```";
        assert!(extract_json(raw).unwrap()["narrations"].is_array());
    }

    #[test]
    fn test_invalid_json_reports_parse_error() {
        match extract_json("not json at all") {
            Err(msg) => assert!(msg.starts_with("Invalid JSON:")),
            Ok(v) => panic!("Expected parse error, got {v}"),
        }
    }

    #[test]
    fn test_code_python_fence_preferred() {
        let raw = "```text\nnotes\n```\n```python\nfrom manim import *\n```";
        assert_eq!(extract_code(raw), "from manim import *");
    }

    #[test]
    fn test_code_generic_fence() {
        let raw = "Fixed:\n```\nprint('x')\n```";
        assert_eq!(extract_code(raw), "print('x')");
    }

    #[test]
    fn test_code_first_block_wins() {
        let raw = "```python\nfirst = 1\n```\n\n```python\nsecond = 2\n```";
        assert_eq!(extract_code(raw), "first = 1");
    }

    #[test]
    fn test_code_without_fence_is_raw_text() {
        let raw = "\nfrom manim import *\nclass GeneratedScene(Scene): pass\n";
        assert_eq!(
            extract_code(raw),
            "from manim import *\nclass GeneratedScene(Scene): pass"
        );
    }
}
