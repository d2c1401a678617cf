use crate::error::CollaboratorError;
use crate::highlight::run_command;

/// One document's rendered math: a shared glyph-defs fragment plus one
/// fragment per expression, in input order. The cache fragment is emitted
/// once, immediately before the first math block.
#[derive(Debug, Clone, Default)]
pub struct MathBatch {
    pub cache: String,
    pub fragments: Vec<String>,
}

/// Display-math collaborator. Invoked once per document with every math
/// block's expression; construct a fresh renderer per document so any
/// glyph cache resets between documents. Failure is fatal to the document:
/// there is no safe textual fallback for a display-math region.
pub trait MathRenderer {
    fn render_batch(&mut self, expressions: &[String]) -> Result<MathBatch, CollaboratorError>;
}

/// Invokes an external TeX-to-SVG tool (the site uses a MathJax wrapper)
/// once per expression, TeX on stdin, SVG on stdout. Glyph sharing is left
/// to the tool, so the cache fragment stays empty.
pub struct CommandMathRenderer {
    program: String,
    args: Vec<String>,
}

impl CommandMathRenderer {
    /// Build from a whitespace-separated command line, e.g.
    /// `node build/tex2svg.js -`.
    pub fn new(command: &str) -> Self {
        let mut parts = command.split_whitespace().map(String::from);
        let program = parts.next().unwrap_or_default();
        CommandMathRenderer {
            program,
            args: parts.collect(),
        }
    }
}

impl MathRenderer for CommandMathRenderer {
    fn render_batch(&mut self, expressions: &[String]) -> Result<MathBatch, CollaboratorError> {
        let mut fragments = Vec::with_capacity(expressions.len());
        for expression in expressions {
            fragments.push(run_command(&self.program, &self.args, None, expression.trim())?);
        }
        Ok(MathBatch {
            cache: String::new(),
            fragments,
        })
    }
}
