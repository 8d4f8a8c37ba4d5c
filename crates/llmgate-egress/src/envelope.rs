//! Final-text extraction from buffered (non-streaming) responses

use llmgate_core::{Error, JsonPath, Result};
use serde_json::Value;

/// Pull the generated text out of a complete JSON envelope.
///
/// Every segment of `path` must exist. A `null` leaf counts as "no text"
/// and yields an empty string; any other non-string leaf is malformed.
pub fn extract(body: &[u8], path: JsonPath) -> Result<String> {
    let document: Value = serde_json::from_slice(body).map_err(|e| {
        Error::MalformedProviderResponse(format!("response is not valid JSON: {}", e))
    })?;
    extract_value(&document, path)
}

pub fn extract_value(document: &Value, path: JsonPath) -> Result<String> {
    let leaf = path
        .lookup(document)
        .map_err(|miss| Error::MalformedProviderResponse(format!("missing field {}", miss.at)))?;

    match leaf {
        Value::String(text) => Ok(text.clone()),
        Value::Null => Ok(String::new()),
        other => Err(Error::MalformedProviderResponse(format!(
            "{} is {}, expected a string",
            path,
            json_type(other)
        ))),
    }
}

fn json_type(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use llmgate_core::ProviderId;
    use serde_json::json;

    fn bytes(value: Value) -> Vec<u8> {
        serde_json::to_vec(&value).unwrap()
    }

    #[test]
    fn test_openai_envelope() {
        let body = bytes(json!({
            "id": "chatcmpl-123",
            "model": "gpt-4o",
            "choices": [{
                "index": 0,
                "message": {"role": "assistant", "content": "x = 4"},
                "finish_reason": "stop"
            }],
            "usage": {"prompt_tokens": 10, "completion_tokens": 3, "total_tokens": 13}
        }));

        let path = ProviderId::OpenAI.config().final_text_path;
        assert_eq!(extract(&body, path).unwrap(), "x = 4");
    }

    #[test]
    fn test_gemini_envelope() {
        let body = bytes(json!({
            "candidates": [{
                "content": {"role": "model", "parts": [{"text": "Photosynthesis is..."}]},
                "finishReason": "STOP"
            }]
        }));

        let path = ProviderId::Gemini.config().final_text_path;
        assert_eq!(extract(&body, path).unwrap(), "Photosynthesis is...");
    }

    #[test]
    fn test_anthropic_envelope() {
        let body = bytes(json!({
            "id": "msg_123",
            "type": "message",
            "role": "assistant",
            "content": [{"type": "text", "text": "Hello from Claude"}],
            "stop_reason": "end_turn"
        }));

        let path = ProviderId::Anthropic.config().final_text_path;
        assert_eq!(extract(&body, path).unwrap(), "Hello from Claude");
    }

    #[test]
    fn test_missing_segment_is_malformed() {
        let path = ProviderId::OpenAI.config().final_text_path;

        for body in [
            json!({}),
            json!({"choices": []}),
            json!({"choices": [{"delta": {"content": "streamed?"}}]}),
            json!({"error": {"message": "quota"}}),
        ] {
            match extract(&bytes(body.clone()), path) {
                Err(Error::MalformedProviderResponse(msg)) => assert!(msg.contains("missing"), "{}", msg),
                other => panic!("expected MalformedProviderResponse for {}, got {:?}", body, other),
            }
        }
    }

    #[test]
    fn test_invalid_json_is_malformed() {
        let path = ProviderId::Anthropic.config().final_text_path;
        assert!(matches!(
            extract(b"<html>502 Bad Gateway</html>", path),
            Err(Error::MalformedProviderResponse(_))
        ));
    }

    #[test]
    fn test_null_content_is_empty_text() {
        let body = bytes(json!({"choices": [{"message": {"role": "assistant", "content": null}}]}));
        let path = ProviderId::DeepSeek.config().final_text_path;
        assert_eq!(extract(&body, path).unwrap(), "");
    }

    #[test]
    fn test_non_string_leaf_is_malformed() {
        let body = bytes(json!({"content": [{"type": "text", "text": 42}]}));
        let path = ProviderId::Anthropic.config().final_text_path;
        match extract(&body, path) {
            Err(Error::MalformedProviderResponse(msg)) => assert!(msg.contains("a number")),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_extraction_is_idempotent() {
        let body = bytes(json!({"content": [{"type": "text", "text": "same"}]}));
        let path = ProviderId::Anthropic.config().final_text_path;

        let first = extract(&body, path).unwrap();
        let second = extract(&body, path).unwrap();
        assert_eq!(first, second);
    }
}
