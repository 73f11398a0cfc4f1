use crate::config::ConverterConfig;
use std::path::Path;
use tokio::process::Command;
use tokio::time::timeout;
use tracing::debug;

/// Run the converter on `source` and return its stdout as markdown
///
/// A converter that outlives `converter.timeout_sec` is killed and reported
/// as an error for this file only.
pub async fn convert_to_markdown(converter: &ConverterConfig, source: &Path) -> Result<String, String> {
    let mut cmd = Command::new(&converter.command);
    cmd.args(&converter.args).arg(source).kill_on_drop(true);

    debug!("Converting {} with {}", source.display(), converter.command);
    let output = match timeout(converter.timeout(), cmd.output()).await {
        Ok(result) => {
            result.map_err(|e| format!("failed to run '{}': {}", converter.command, e))?
        }
        Err(_) => {
            return Err(format!(
                "'{}' timed out after {}s",
                converter.command, converter.timeout_sec
            ))
        }
    };

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(format!(
            "'{}' exited with code {}: {}",
            converter.command,
            output.status.code().unwrap_or(-1),
            stderr.trim()
        ));
    }

    let markdown = String::from_utf8_lossy(&output.stdout).to_string();
    if markdown.trim().is_empty() {
        return Err(format!("'{}' produced no output", converter.command));
    }
    Ok(markdown)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Instant;

    fn shell(script: &str, timeout_sec: u64) -> ConverterConfig {
        ConverterConfig {
            command: "sh".into(),
            args: vec!["-c".into(), script.into()],
            timeout_sec,
        }
    }

    #[tokio::test]
    async fn test_stdout_becomes_markdown() {
        let text = convert_to_markdown(&shell("echo converted", 5), Path::new("a.pdf"))
            .await
            .unwrap();
        assert_eq!(text, "converted\n");
    }

    #[tokio::test]
    async fn test_slow_converter_times_out() {
        let started = Instant::now();
        let err = convert_to_markdown(&shell("sleep 5; echo late", 1), Path::new("a.pdf"))
            .await
            .unwrap_err();
        assert!(err.contains("timed out after 1s"), "{}", err);
        assert!(started.elapsed().as_secs() < 4);
    }
}
