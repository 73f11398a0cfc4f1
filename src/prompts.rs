use crate::config::PromptsConfig;
use crate::error::ConfigError;
use std::path::Path;
use tracing::info;

const DEFAULT_ANALYST_SYSTEM: &str = include_str!("../prompts/analyst_system.md");
const DEFAULT_ANALYST_USER: &str = include_str!("../prompts/analyst_user.md");
const DEFAULT_ARCHITECT_SYSTEM: &str = include_str!("../prompts/architect_system.md");
const DEFAULT_ARCHITECT_USER: &str = include_str!("../prompts/architect_user.md");
const DEFAULT_ARCHITECT_CORRECTION: &str = include_str!("../prompts/architect_correction.md");
const DEFAULT_WRITER_SYSTEM: &str = include_str!("../prompts/writer_system.md");
const DEFAULT_WRITER_USER: &str = include_str!("../prompts/writer_user.md");

/// Prompt templates for every model-backed stage
#[derive(Debug, Clone)]
pub struct PromptSet {
    pub analyst_system: String,
    pub analyst_user: String,
    pub architect_system: String,
    pub architect_user: String,
    pub architect_correction: String,
    pub writer_system: String,
    pub writer_user: String,
}

impl Default for PromptSet {
    fn default() -> Self {
        Self {
            analyst_system: DEFAULT_ANALYST_SYSTEM.to_string(),
            analyst_user: DEFAULT_ANALYST_USER.to_string(),
            architect_system: DEFAULT_ARCHITECT_SYSTEM.to_string(),
            architect_user: DEFAULT_ARCHITECT_USER.to_string(),
            architect_correction: DEFAULT_ARCHITECT_CORRECTION.to_string(),
            writer_system: DEFAULT_WRITER_SYSTEM.to_string(),
            writer_user: DEFAULT_WRITER_USER.to_string(),
        }
    }
}

impl PromptSet {
    /// Embedded templates, replaced by `<dir>/<name>.md` where present
    pub fn load(config: &PromptsConfig) -> Result<Self, ConfigError> {
        let mut prompts = Self::default();
        let dir = match &config.dir {
            Some(dir) => dir,
            None => return Ok(prompts),
        };

        let slots: [(&str, &mut String); 7] = [
            ("analyst_system", &mut prompts.analyst_system),
            ("analyst_user", &mut prompts.analyst_user),
            ("architect_system", &mut prompts.architect_system),
            ("architect_user", &mut prompts.architect_user),
            ("architect_correction", &mut prompts.architect_correction),
            ("writer_system", &mut prompts.writer_system),
            ("writer_user", &mut prompts.writer_user),
        ];
        for (name, slot) in slots {
            if let Some(text) = read_override(dir, name)? {
                *slot = text;
            }
        }
        Ok(prompts)
    }
}

fn read_override(dir: &Path, name: &str) -> Result<Option<String>, ConfigError> {
    let path = dir.join(format!("{}.md", name));
    if !path.exists() {
        return Ok(None);
    }
    let text = std::fs::read_to_string(&path).map_err(|e| ConfigError::ReadPrompt {
        path: path.clone(),
        source: e,
    })?;
    info!("Using prompt override {}", path.display());
    Ok(Some(text))
}

/// Substitute `{{KEY}}` placeholders
pub fn render(template: &str, vars: &[(&str, &str)]) -> String {
    let mut out = template.to_string();
    for (key, value) in vars {
        out = out.replace(&format!("{{{{{}}}}}", key), value);
    }
    out
}

/// First `limit` characters of `text`
pub fn truncate_chars(text: &str, limit: usize) -> &str {
    match text.char_indices().nth(limit) {
        Some((byte, _)) => &text[..byte],
        None => text,
    }
}
