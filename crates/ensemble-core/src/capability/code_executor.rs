use crate::capability::traits::{required_str, Capability, CapabilityResult};
use crate::config::SandboxSettings;
use crate::error::EnsembleError;
use serde_json::Value;
use std::process::Stdio;
use std::time::Duration;
use tokio::io::AsyncWriteExt;

/// Runs Python snippets in a separate, resource-limited interpreter process.
///
/// The child gets an empty environment, the system temp directory as its
/// working directory, isolated mode (`-I -S`), CPU and address-space rlimits
/// on unix, a wall-clock timeout and a cap on captured output. Only
/// registered when the sandbox is enabled in settings.
pub struct CodeExecutorTool {
    settings: SandboxSettings,
}

impl CodeExecutorTool {
    pub fn new(settings: SandboxSettings) -> Self {
        Self { settings }
    }

    fn command(&self) -> tokio::process::Command {
        #[cfg(unix)]
        let mut cmd = {
            let mut cmd = tokio::process::Command::new("/bin/sh");
            cmd.arg("-c")
                .arg(format!(
                    "ulimit -t {} && ulimit -v {} && exec \"$0\" -I -S -",
                    self.settings.cpu_seconds, self.settings.memory_kb
                ))
                .arg(&self.settings.interpreter);
            cmd
        };
        #[cfg(not(unix))]
        let mut cmd = {
            let mut cmd = tokio::process::Command::new(&self.settings.interpreter);
            cmd.arg("-I").arg("-S").arg("-");
            cmd
        };

        cmd.env_clear()
            .env("PATH", "/usr/local/bin:/usr/bin:/bin")
            .current_dir(std::env::temp_dir())
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        cmd
    }
}

#[async_trait::async_trait]
impl Capability for CodeExecutorTool {
    fn name(&self) -> &str {
        "code_executor"
    }

    fn description(&self) -> &str {
        "Execute a Python code snippet in a sandbox and return what it prints."
    }

    fn parameters_schema(&self) -> Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "code": { "type": "string", "description": "Python source to run" },
                "language": { "type": "string", "default": "python" }
            },
            "required": ["code"]
        })
    }

    async fn invoke(&self, args: Value) -> CapabilityResult {
        let code = required_str(&args, self.name(), "code")?;
        let language = args
            .get("language")
            .and_then(|v| v.as_str())
            .unwrap_or("python");
        if !language.eq_ignore_ascii_case("python") {
            return Err(EnsembleError::execution(
                self.name(),
                format!("Unsupported language: {language}"),
            ));
        }

        let mut child = self
            .command()
            .spawn()
            .map_err(|e| EnsembleError::execution(self.name(), format!("Failed to start sandbox: {e}")))?;

        if let Some(mut stdin) = child.stdin.take() {
            stdin
                .write_all(code.as_bytes())
                .await
                .map_err(|e| EnsembleError::execution(self.name(), format!("Failed to send code: {e}")))?;
        }

        let timeout_secs = self.settings.timeout_secs;
        let output = tokio::time::timeout(Duration::from_secs(timeout_secs), child.wait_with_output())
            .await
            .map_err(|_| {
                EnsembleError::execution(self.name(), format!("Execution timed out after {timeout_secs}s"))
            })?
            .map_err(|e| EnsembleError::execution(self.name(), format!("Sandbox failed: {e}")))?;

        let max = self.settings.max_output_chars;
        if output.status.success() {
            let stdout = String::from_utf8_lossy(&output.stdout);
            let stdout = stdout.trim_end();
            if stdout.is_empty() {
                Ok("[Code executed successfully, no output.]".to_string())
            } else {
                Ok(clip(stdout, max))
            }
        } else {
            let stderr = String::from_utf8_lossy(&output.stderr);
            let reason = stderr
                .lines()
                .rev()
                .find(|l| !l.trim().is_empty())
                .map(str::to_string)
                .unwrap_or_else(|| format!("exit status {}", output.status));
            Ok(format!("[Code execution error: {}]", clip(&reason, max)))
        }
    }
}

fn clip(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((cut, _)) => format!("{}\n... [output truncated]", &text[..cut]),
        None => text.to_string(),
    }
}
