//! Helpers for pulling embedded JSON out of YouTube HTML pages

use serde_json::Value;

/// Find `name = {...}` (or `name={...}`) in `html` and parse the object.
///
/// The object end is found by brace matching that skips over string
/// literals, so `};` inside titles or descriptions does not cut it short.
pub fn extract_assigned_json(html: &str, name: &str) -> Option<Value> {
    let mut search_from = 0;
    while let Some(pos) = html[search_from..].find(name) {
        let after_name = search_from + pos + name.len();
        let rest = html[after_name..].trim_start();
        if let Some(rest) = rest.strip_prefix('=') {
            let rest = rest.trim_start();
            if rest.starts_with('{') {
                let end = matching_brace(rest)?;
                return serde_json::from_str(&rest[..=end]).ok();
            }
        }
        search_from = after_name;
    }
    None
}

/// Byte index of the `}` closing the object that starts at `text[0]`
fn matching_brace(text: &str) -> Option<usize> {
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for (i, byte) in text.bytes().enumerate() {
        if in_string {
            match byte {
                _ if escaped => escaped = false,
                b'\\' => escaped = true,
                b'"' => in_string = false,
                _ => {}
            }
            continue;
        }
        match byte {
            b'"' => in_string = true,
            b'{' => depth += 1,
            b'}' => {
                depth = depth.checked_sub(1)?;
                if depth == 0 {
                    return Some(i);
                }
            }
            _ => {}
        }
    }
    None
}

/// Text of a renderer field: either `{simpleText}` or `{runs: [{text}]}`
pub fn text_of(value: &Value) -> Option<String> {
    if let Some(text) = value.get("simpleText").and_then(Value::as_str) {
        return Some(text.to_string());
    }
    let runs = value.get("runs")?.as_array()?;
    let joined: String = runs
        .iter()
        .filter_map(|run| run.get("text").and_then(Value::as_str))
        .collect();
    (!joined.is_empty()).then_some(joined)
}

/// URL of the widest thumbnail in a `{thumbnails: [...]}` object
pub fn best_thumbnail(value: &Value) -> Option<String> {
    value
        .get("thumbnails")?
        .as_array()?
        .iter()
        .max_by_key(|thumb| thumb.get("width").and_then(Value::as_u64).unwrap_or(0))
        .and_then(|thumb| thumb.get("url").and_then(Value::as_str))
        .map(str::to_string)
}

/// Collect every object stored under `key`, depth-first. Array order is kept.
pub fn collect_renderers<'a>(root: &'a Value, key: &str, out: &mut Vec<&'a Value>) {
    match root {
        Value::Object(map) => {
            for (k, v) in map {
                if k == key {
                    out.push(v);
                } else {
                    collect_renderers(v, key, out);
                }
            }
        }
        Value::Array(items) => {
            for item in items {
                collect_renderers(item, key, out);
            }
        }
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_extract_with_tricky_strings() {
        let html = r#"<script>var ytInitialData = {"a": "brace } and \" quote };", "b": {"c": 1}};</script>"#;
        let value = extract_assigned_json(html, "ytInitialData").unwrap();
        assert_eq!(value["b"]["c"], 1);
        assert_eq!(value["a"], "brace } and \" quote };");
    }

    #[test]
    fn test_extract_skips_non_assignment() {
        let html = r#"window["ytInitialPlayerResponse"]; var ytInitialPlayerResponse={"ok":true};"#;
        let value = extract_assigned_json(html, "ytInitialPlayerResponse").unwrap();
        assert_eq!(value["ok"], true);
        assert!(extract_assigned_json("nothing here", "ytInitialData").is_none());
        assert!(extract_assigned_json("var ytInitialData = {\"open\": 1", "ytInitialData").is_none());
    }

    #[test]
    fn test_text_and_thumbnail() {
        assert_eq!(text_of(&json!({"simpleText": "3:45"})).unwrap(), "3:45");
        assert_eq!(
            text_of(&json!({"runs": [{"text": "Rick"}, {"text": " Astley"}]})).unwrap(),
            "Rick Astley"
        );
        assert!(text_of(&json!({})).is_none());

        let thumbs = json!({"thumbnails": [
            {"url": "small", "width": 120},
            {"url": "large", "width": 480},
        ]});
        assert_eq!(best_thumbnail(&thumbs).unwrap(), "large");
    }

    #[test]
    fn test_collect_renderers() {
        let data = json!({"contents": [
            {"videoRenderer": {"videoId": "a"}},
            {"shelf": {"items": [{"videoRenderer": {"videoId": "b"}}]}},
        ]});
        let mut found = Vec::new();
        collect_renderers(&data, "videoRenderer", &mut found);
        let ids: Vec<_> = found.iter().map(|v| v["videoId"].as_str().unwrap()).collect();
        assert_eq!(ids, vec!["a", "b"]);
    }
}
