//! YAML front matter extraction for Markdown extension definitions

use std::collections::BTreeMap;

/// Split a Markdown document into its YAML front matter block and body.
///
/// Returns `None` when the document does not open with a `---` fence.
pub fn split(content: &str) -> Option<(&str, &str)> {
    let rest = content.strip_prefix("---")?;
    let rest = rest.strip_prefix('\n').or_else(|| rest.strip_prefix("\r\n"))?;

    for (offset, line) in line_spans(rest) {
        if line.trim_end() == "---" {
            let yaml = &rest[..offset];
            let body = &rest[offset + line.len()..];
            return Some((yaml, body.trim_start_matches(['\r', '\n'])));
        }
    }
    None
}

fn line_spans(text: &str) -> impl Iterator<Item = (usize, &str)> {
    let mut offset = 0;
    text.split_inclusive('\n').map(move |line| {
        let span = (offset, line);
        offset += line.len();
        span
    })
}

/// Parse front matter into a flat string map; nested values are serialized
/// back to YAML strings. Returns `None` when the YAML is malformed or not a
/// mapping.
pub fn parse_fields(yaml: &str) -> Option<BTreeMap<String, String>> {
    let value: serde_yaml::Value = serde_yaml::from_str(yaml).ok()?;
    let mapping = value.as_mapping()?;

    let mut fields = BTreeMap::new();
    for (key, value) in mapping {
        let key = key.as_str()?.to_string();
        let rendered = match value {
            serde_yaml::Value::String(s) => s.clone(),
            serde_yaml::Value::Bool(b) => b.to_string(),
            serde_yaml::Value::Number(n) => n.to_string(),
            other => serde_yaml::to_string(other).ok()?.trim_end().to_string(),
        };
        fields.insert(key, rendered);
    }
    Some(fields)
}
