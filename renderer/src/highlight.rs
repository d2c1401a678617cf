use std::io::Write;
use std::process::{Command, Stdio};

use crate::error::CollaboratorError;
use crate::escape::{escape_attr, escape_text};

/// Syntax-highlighting collaborator: takes source text and a language tag,
/// returns highlighted HTML. Failures are recoverable; the pipeline falls
/// back to escaped plain text and warns.
pub trait Highlighter {
    fn highlight(&self, code: &str, language: &str) -> Result<String, CollaboratorError>;
}

/// Escapes the source without any colouring. Never fails.
pub struct PlainHighlighter;

impl Highlighter for PlainHighlighter {
    fn highlight(&self, code: &str, _language: &str) -> Result<String, CollaboratorError> {
        Ok(escape_text(code))
    }
}

/// Runs an external highlighter program (the site uses a highlight.js
/// wrapper): the language tag is appended to the arguments and the source
/// is written to stdin; stdout is the highlighted HTML.
pub struct CommandHighlighter {
    program: String,
    args: Vec<String>,
}

impl CommandHighlighter {
    /// Build from a whitespace-separated command line, e.g.
    /// `node build/highlight.js`.
    pub fn new(command: &str) -> Self {
        let mut parts = command.split_whitespace().map(String::from);
        let program = parts.next().unwrap_or_default();
        CommandHighlighter {
            program,
            args: parts.collect(),
        }
    }
}

impl Highlighter for CommandHighlighter {
    fn highlight(&self, code: &str, language: &str) -> Result<String, CollaboratorError> {
        run_command(&self.program, &self.args, Some(language), code)
    }
}

/// Spawn `program args.. [extra]`, write `input` to stdin, and return
/// trimmed stdout. Spawn, I/O, and non-zero-exit failures all become
/// collaborator errors.
pub(crate) fn run_command(
    program: &str,
    args: &[String],
    extra: Option<&str>,
    input: &str,
) -> Result<String, CollaboratorError> {
    let mut command = Command::new(program);
    command.args(args);
    if let Some(extra) = extra {
        command.arg(extra);
    }
    let mut child = command
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .map_err(|e| CollaboratorError(format!("cannot run '{}': {}", program, e)))?;

    child
        .stdin
        .take()
        .ok_or_else(|| CollaboratorError(format!("'{}' did not open stdin", program)))?
        .write_all(input.as_bytes())
        .map_err(|e| CollaboratorError(format!("cannot write to '{}': {}", program, e)))?;

    let output = child
        .wait_with_output()
        .map_err(|e| CollaboratorError(format!("'{}' failed: {}", program, e)))?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(CollaboratorError(format!(
            "'{}' exited with {}: {}",
            program,
            output.status,
            stderr.trim()
        )));
    }

    String::from_utf8(output.stdout)
        .map(|s| s.trim_end_matches('\n').to_string())
        .map_err(|_| CollaboratorError(format!("'{}' produced non-UTF-8 output", program)))
}

/// Wrap highlighted code in the structure the site styles expect.
pub fn format_code_block(language: &str, highlighted: &str) -> String {
    format!(
        "<div class=\"code-block\">\n    <span class=\"code-language-tag\">{}</span>\n    <div class=\"code-scroll\">\n        <pre><code class=\"language-{} hljs\">{}</code></pre>\n    </div>\n</div>",
        escape_text(language),
        escape_attr(language),
        highlighted,
    )
}
