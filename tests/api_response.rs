use chefchat::api::response::{extract_api_error_message, extract_json_payload};
use serde_json::json;

#[test]
fn upstream_error_message_is_extracted() {
    let body = json!({
        "error": {
            "message": "Invalid API key",
            "type": "authentication_error"
        }
    })
    .to_string();

    assert_eq!(
        extract_api_error_message(&body),
        Some("Invalid API key".to_string())
    );
}

#[test]
fn non_json_error_body_yields_none() {
    assert_eq!(extract_api_error_message("<html>502</html>"), None);
    assert_eq!(extract_api_error_message(""), None);
}

#[test]
fn error_body_without_message_yields_none() {
    let body = json!({"error": {"code": 42}}).to_string();
    assert_eq!(extract_api_error_message(&body), None);
}

#[test]
fn json_fence_is_stripped() {
    let content = "说明文字\n```json\n{\"name\": \"可乐鸡翅\"}\n```\n后记";
    assert_eq!(extract_json_payload(content), "{\"name\": \"可乐鸡翅\"}");
}

#[test]
fn bare_fence_is_stripped_too() {
    let content = "```\n{\"name\": \"可乐鸡翅\"}\n```";
    assert_eq!(extract_json_payload(content), "{\"name\": \"可乐鸡翅\"}");
}

#[test]
fn unfenced_content_is_returned_trimmed() {
    let content = "  {\"name\": \"可乐鸡翅\"}  ";
    assert_eq!(extract_json_payload(content), "{\"name\": \"可乐鸡翅\"}");
}

#[test]
fn multiline_payload_survives_the_fence() {
    let content = "```json\n{\n  \"name\": \"汤\",\n  \"category\": \"汤羹\"\n}\n```";
    let payload = extract_json_payload(content);
    let parsed: serde_json::Value = serde_json::from_str(payload).unwrap();
    assert_eq!(parsed["category"], "汤羹");
}
