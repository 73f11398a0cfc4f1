use regex::Regex;

/// Comparable form of a heading: lowercase words, punctuation dropped
pub fn normalize_heading(text: &str) -> String {
    text.chars()
        .map(|c| {
            if c.is_alphanumeric() {
                c.to_lowercase().next().unwrap_or(c)
            } else if c.is_whitespace() {
                ' '
            } else {
                '\0'
            }
        })
        .filter(|c| *c != '\0')
        .collect::<String>()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

/// Parse an ATX heading line into (level, text)
pub fn parse_heading(line: &str) -> Option<(u8, &str)> {
    let re = Regex::new(r"^ {0,3}(#{1,6})[ \t]+(.*?)(?:[ \t]+#+)?[ \t]*$").ok()?;
    let caps = re.captures(line)?;
    let level = caps.get(1)?.as_str().len() as u8;
    let text = caps.get(2).map(|m| m.as_str()).unwrap_or("");
    Some((level, text))
}

/// True when the content already opens with this section's heading
///
/// Matches the first non-blank line when it is a heading no deeper than
/// `level` whose text equals `title` after normalization.
pub fn opens_with_heading(content: &str, level: u8, title: &str) -> bool {
    let first = match content.lines().find(|l| !l.trim().is_empty()) {
        Some(line) => line,
        None => return false,
    };
    match parse_heading(first) {
        Some((found, text)) => found <= level && normalize_heading(text) == normalize_heading(title),
        None => false,
    }
}
