//! Subprocess code sandbox
//!
//! Runs Python through an interpreter, or compiles C/C++ with gcc/g++ and runs
//! the binary, all inside a throwaway temp directory. Each subprocess gets the
//! same timeout. The result is always a display string; nothing escapes as
//! an error.

use async_trait::async_trait;
use std::path::Path;
use std::process::Output;
use std::time::Duration;
use tempfile::TempDir;
use tokio::process::Command;
use tracing::{debug, warn};

/// Default per-subprocess timeout
pub const DEFAULT_SANDBOX_TIMEOUT: Duration = Duration::from_secs(5);

/// Languages the sandbox can run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Language {
    Python,
    C,
    Cpp,
}

impl Language {
    /// Parse the exact lower-case tag used in tool calls
    pub fn parse(tag: &str) -> Option<Self> {
        match tag {
            "python" => Some(Language::Python),
            "c" => Some(Language::C),
            "cpp" => Some(Language::Cpp),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Language::Python => "python",
            Language::C => "c",
            Language::Cpp => "cpp",
        }
    }
}

/// Executes untrusted snippets
#[async_trait]
pub trait CodeSandbox: Send + Sync {
    /// Run `code` and describe what happened
    async fn execute(&self, code: &str, language: &str) -> String;
}

#[derive(Debug, Clone)]
pub struct ProcessSandbox {
    timeout: Duration,
    python: String,
    c_compiler: String,
    cpp_compiler: String,
}

impl Default for ProcessSandbox {
    fn default() -> Self {
        Self {
            timeout: DEFAULT_SANDBOX_TIMEOUT,
            python: "python3".to_string(),
            c_compiler: "gcc".to_string(),
            cpp_compiler: "g++".to_string(),
        }
    }
}

enum RunError {
    TimedOut,
    Spawn(std::io::Error),
    Io(std::io::Error),
}

impl From<std::io::Error> for RunError {
    fn from(e: std::io::Error) -> Self {
        RunError::Io(e)
    }
}

impl ProcessSandbox {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_python(mut self, program: impl Into<String>) -> Self {
        self.python = program.into();
        self
    }

    pub fn with_compilers(mut self, c: impl Into<String>, cpp: impl Into<String>) -> Self {
        self.c_compiler = c.into();
        self.cpp_compiler = cpp.into();
        self
    }

    async fn run(&self, program: &Path, args: &[&Path]) -> Result<Output, RunError> {
        let mut command = Command::new(program);
        command.args(args).kill_on_drop(true);

        match tokio::time::timeout(self.timeout, command.output()).await {
            Ok(Ok(output)) => Ok(output),
            Ok(Err(e)) => Err(RunError::Spawn(e)),
            Err(_) => Err(RunError::TimedOut),
        }
    }

    async fn run_python(&self, dir: &Path, code: &str) -> Result<String, RunError> {
        let script = dir.join("program.py");
        tokio::fs::write(&script, code).await?;

        let output = self
            .run(Path::new(&self.python), &[script.as_path()])
            .await?;
        let (out, err) = captured(&output);
        if !output.status.success() {
            return Ok(format!(
                "Python error (exit {}):\n{}",
                exit_code(&output),
                if err.is_empty() { out } else { err }
            ));
        }
        Ok(no_output_placeholder(out))
    }

    async fn run_compiled(
        &self,
        dir: &Path,
        code: &str,
        language: Language,
    ) -> Result<String, RunError> {
        let (suffix, compiler) = match language {
            Language::Cpp => ("cpp", &self.cpp_compiler),
            _ => ("c", &self.c_compiler),
        };
        let source = dir.join(format!("program.{}", suffix));
        let binary = dir.join("program");
        tokio::fs::write(&source, code).await?;

        let compiled = self
            .run(
                Path::new(compiler),
                &[source.as_path(), Path::new("-o"), binary.as_path()],
            )
            .await?;
        if !compiled.status.success() {
            let (out, err) = captured(&compiled);
            return Ok(format!(
                "Compilation failed:\n{}",
                if err.is_empty() { out } else { err }
            ));
        }

        let output = self.run(&binary, &[]).await?;
        let (out, err) = captured(&output);
        if !output.status.success() {
            return Ok(format!(
                "Program exited with code {}:\n{}",
                exit_code(&output),
                if err.is_empty() { out } else { err }
            ));
        }
        Ok(no_output_placeholder(out))
    }
}

#[async_trait]
impl CodeSandbox for ProcessSandbox {
    async fn execute(&self, code: &str, language: &str) -> String {
        let code = dedent(code);
        let code = code.trim();
        if code.is_empty() {
            return "No code provided.".to_string();
        }
        let Some(lang) = Language::parse(language) else {
            return format!("Unsupported language: {}", language);
        };

        let dir = match TempDir::new() {
            Ok(dir) => dir,
            Err(e) => return format!("Execution error: {}", e),
        };
        debug!(language = lang.as_str(), bytes = code.len(), "Sandbox run");

        let result = match lang {
            Language::Python => self.run_python(dir.path(), code).await,
            Language::C | Language::Cpp => self.run_compiled(dir.path(), code, lang).await,
        };

        match result {
            Ok(text) => text,
            Err(RunError::TimedOut) => {
                warn!(timeout_secs = self.timeout.as_secs_f64(), "Sandbox run timed out");
                "Execution timed out.".to_string()
            }
            Err(RunError::Spawn(e)) | Err(RunError::Io(e)) => format!("Execution error: {}", e),
        }
    }
}

/// Remove the common leading whitespace from every non-blank line
pub fn dedent(text: &str) -> String {
    let margin = text
        .lines()
        .filter(|l| !l.trim().is_empty())
        .map(|l| l.len() - l.trim_start().len())
        .min()
        .unwrap_or(0);

    text.lines()
        .map(|l| {
            if l.trim().is_empty() {
                ""
            } else {
                l.get(margin..).unwrap_or(l)
            }
        })
        .collect::<Vec<_>>()
        .join("\n")
}

fn captured(output: &Output) -> (String, String) {
    (
        String::from_utf8_lossy(&output.stdout).trim().to_string(),
        String::from_utf8_lossy(&output.stderr).trim().to_string(),
    )
}

fn exit_code(output: &Output) -> i32 {
    output.status.code().unwrap_or(-1)
}

fn no_output_placeholder(out: String) -> String {
    if out.is_empty() {
        "(no output)".to_string()
    } else {
        out
    }
}
