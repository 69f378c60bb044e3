use regex::Regex;
use serde_json::Value;

/// Pull the upstream error message out of a non-success response body,
/// when the body follows the `{"error": {"message": ...}}` convention.
pub fn extract_api_error_message(body: &str) -> Option<String> {
    let parsed: Value = serde_json::from_str(body).ok()?;
    parsed
        .get("error")
        .and_then(|e| e.get("message"))
        .and_then(|m| m.as_str())
        .map(|s| s.to_string())
}

/// Extract a JSON payload the model may have wrapped in a fenced code
/// block. Tries a ```json fence first, then a bare fence, then returns
/// the input trimmed.
pub fn extract_json_payload(content: &str) -> &str {
    let fenced = Regex::new(r"(?s)```json\s*(.*?)\s*```").unwrap();
    if let Some(captures) = fenced.captures(content) {
        if let Some(m) = captures.get(1) {
            return m.as_str();
        }
    }

    let bare = Regex::new(r"(?s)```\s*(.*?)\s*```").unwrap();
    if let Some(captures) = bare.captures(content) {
        if let Some(m) = captures.get(1) {
            return m.as_str();
        }
    }

    content.trim()
}
