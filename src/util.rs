//! Small text helpers shared across modules.

/// Pull the first balanced `{...}` object out of a model reply.
///
/// Replies often wrap JSON in markdown fences or a sentence of prose. Braces
/// inside string literals are skipped. Returns `None` when no complete object
/// is present.
pub fn extract_json_object(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for (offset, c) in text[start..].char_indices() {
        if in_string {
            match c {
                _ if escaped => escaped = false,
                '\\' => escaped = true,
                '"' => in_string = false,
                _ => {}
            }
            continue;
        }

        match c {
            '"' => in_string = true,
            '{' => depth += 1,
            '}' => {
                depth -= 1;
                if depth == 0 {
                    let end = start + offset + c.len_utf8();
                    return Some(&text[start..end]);
                }
            }
            _ => {}
        }
    }

    None
}

/// Parse the first JSON object in `text` into `T`.
pub fn parse_json_object<T: serde::de::DeserializeOwned>(text: &str) -> anyhow::Result<T> {
    let object = extract_json_object(text)
        .ok_or_else(|| anyhow::anyhow!("reply contains no JSON object"))?;
    Ok(serde_json::from_str(object)?)
}
