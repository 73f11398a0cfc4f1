use std::path::PathBuf;

pub fn default_materials_dir() -> PathBuf {
    PathBuf::from("materials")
}

pub fn default_output_dir() -> PathBuf {
    PathBuf::from("output")
}

pub fn default_converter_command() -> String {
    "markitdown".to_string()
}

pub fn default_converter_timeout_sec() -> u64 {
    120
}

pub fn default_claude_binary() -> PathBuf {
    // Check common install location first
    if let Some(home) = std::env::var_os("HOME") {
        let local_path = PathBuf::from(home).join(".claude/local/claude");
        if local_path.exists() {
            return local_path;
        }
    }
    // Fall back to PATH lookup
    PathBuf::from("claude")
}

pub fn default_codex_binary() -> PathBuf {
    PathBuf::from("codex")
}

pub fn default_codex_model() -> String {
    "gpt-4.1".to_string()
}

pub fn default_openai_base_url() -> String {
    "https://api.openai.com/v1".to_string()
}

pub fn default_openai_model() -> String {
    "gpt-4o".to_string()
}

pub fn default_api_key_env() -> String {
    "LLM_API_KEY".to_string()
}

pub fn default_temperature() -> f32 {
    0.1
}

pub fn default_max_tokens() -> u32 {
    4000
}

pub fn default_max_retries() -> u32 {
    3
}

pub fn default_wait_ms() -> u64 {
    1000
}

pub fn default_timeout_sec() -> Option<u64> {
    Some(300)
}

pub fn default_concurrency() -> usize {
    4
}

pub fn default_analysis_chars() -> usize {
    15_000
}

pub fn default_writing_chars() -> usize {
    10_000
}

pub fn default_true() -> bool {
    true
}
