//! Response text extraction from a raw agent result.
//!
//! Policy, applied to the content representation of the result:
//! - a sequence of blocks: concatenate each block's own `text` field, in order.
//!   Blocks need no type discriminator; blocks without `text` are skipped.
//! - a bare string: used as-is.
//! - anything else: empty response.
//!
//! The content representation is `result.message.content` when present,
//! otherwise `result.content`, otherwise the result itself.

use serde_json::Value;

/// Shape of the content found in a result
#[derive(Debug, PartialEq)]
enum ResponseContent<'a> {
    Blocks(&'a [Value]),
    Text(&'a str),
    Empty,
}

fn content_of(result: &Value) -> &Value {
    if let Some(content) = result.get("message").and_then(|m| m.get("content")) {
        return content;
    }
    result.get("content").unwrap_or(result)
}

fn classify(content: &Value) -> ResponseContent<'_> {
    match content {
        Value::Array(blocks) => ResponseContent::Blocks(blocks),
        Value::String(text) => ResponseContent::Text(text),
        _ => ResponseContent::Empty,
    }
}

/// Flatten a raw agent result into response text. Never fails.
pub fn extract_response_text(result: &Value) -> String {
    match classify(content_of(result)) {
        ResponseContent::Blocks(blocks) => blocks
            .iter()
            .filter_map(|block| block.get("text").and_then(Value::as_str))
            .collect(),
        ResponseContent::Text(text) => text.to_string(),
        ResponseContent::Empty => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_blocks_are_concatenated_without_type_filter() {
        let result = json!({
            "message": {
                "role": "assistant",
                "content": [
                    {"text": "hello "},
                    {"type": "reasoning", "text": "there"},
                    {"toolUse": {"name": "search"}},
                    "stray string block",
                    {"text": 42}
                ]
            }
        });
        assert_eq!(extract_response_text(&result), "hello there");
    }

    #[test]
    fn test_bare_string_content_used_as_is() {
        let result = json!({"message": {"role": "assistant", "content": "hi!"}, "done": true});
        assert_eq!(extract_response_text(&result), "hi!");
    }

    #[test]
    fn test_top_level_content_and_bare_value() {
        assert_eq!(
            extract_response_text(&json!({"content": [{"text": "a"}, {"text": "b"}]})),
            "ab"
        );
        assert_eq!(extract_response_text(&json!("plain")), "plain");
    }

    #[test]
    fn test_unrecoverable_shapes_yield_empty() {
        for result in [
            json!(null),
            json!({}),
            json!({"message": null}),
            json!({"message": {"content": null}}),
            json!({"message": {"content": {"text": "nested object"}}}),
            json!({"message": {"content": []}}),
            json!(17),
        ] {
            assert_eq!(extract_response_text(&result), "", "result: {result}");
        }
    }

    #[test]
    fn test_classify_variants() {
        assert_eq!(classify(&json!("x")), ResponseContent::Text("x"));
        assert_eq!(classify(&json!(true)), ResponseContent::Empty);
        assert!(matches!(classify(&json!([1])), ResponseContent::Blocks(b) if b.len() == 1));
    }
}
