use serde_json::{json, Value};

/// Wrap plain text in the smallest Atlassian Document Format (ADF) document
/// Jira accepts for comments and descriptions: one paragraph, one text node.
pub fn to_adf(text: &str) -> Value {
    json!({
        "type": "doc",
        "version": 1,
        "content": [{
            "type": "paragraph",
            "content": [{ "type": "text", "text": text }],
        }],
    })
}

/// Extract plain text from an ADF value. Block nodes are joined with
/// newlines so paragraph breaks survive into prompts.
pub fn extract_text_from_adf(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        Value::Array(arr) => {
            let parts: Vec<String> = arr.iter().filter_map(extract_text_from_adf).collect();
            if parts.is_empty() {
                None
            } else {
                let sep = if arr.iter().all(is_inline) { "" } else { "\n" };
                Some(parts.join(sep))
            }
        }
        Value::Object(obj) => {
            match obj.get("type").and_then(|v| v.as_str()) {
                Some("text") => return obj.get("text").and_then(|v| v.as_str()).map(String::from),
                Some("hardBreak") => return Some("\n".into()),
                _ => {}
            }
            if let Some(content) = obj.get("content") {
                return extract_text_from_adf(content);
            }
            None
        }
        _ => None,
    }
}

fn is_inline(node: &Value) -> bool {
    matches!(
        node.get("type").and_then(|v| v.as_str()),
        Some("text" | "hardBreak" | "mention" | "emoji" | "inlineCard")
    )
}
