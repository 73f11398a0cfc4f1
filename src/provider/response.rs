use serde::Deserialize;
use serde_json::Value;

/// Claude CLI wraps the model reply in `{"result": "...", ...}`
#[derive(Debug, Deserialize)]
pub struct ClaudeOutput {
    pub result: String,
    #[serde(default)]
    pub is_error: bool,
}

/// Extract a JSON object or array from text that may wrap it in prose or
/// markdown code fences
pub fn extract_json(s: &str) -> Option<Value> {
    let trimmed = s.trim();

    // First try: the whole string is valid JSON
    if trimmed.starts_with('{') || trimmed.starts_with('[') {
        if let Ok(value) = serde_json::from_str::<Value>(trimmed) {
            return Some(value);
        }
    }

    // Second try: extract from markdown code block
    let re = regex::Regex::new(r"```(?:json)?\s*\n?([\s\S]*?)\n?```").ok()?;
    for cap in re.captures_iter(s) {
        let potential_json = cap.get(1)?.as_str().trim();
        if let Ok(value) = serde_json::from_str::<Value>(potential_json) {
            return Some(value);
        }
    }

    // Third try: first balanced object, ignoring braces inside strings
    let brace_start = s.find('{')?;
    let mut depth = 0;
    let mut in_string = false;
    let mut escaped = false;
    let mut end = None;

    for (i, c) in s[brace_start..].char_indices() {
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
                    end = Some(brace_start + i + 1);
                    break;
                }
            }
            _ => {}
        }
    }

    serde_json::from_str(&s[brace_start..end?]).ok()
}
