use std::fmt;
use std::ops::Range;

/// An error reported by an external collaborator (highlighter or math
/// renderer) invocation.
#[derive(Debug, Clone)]
pub struct CollaboratorError(pub String);

impl fmt::Display for CollaboratorError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::error::Error for CollaboratorError {}

#[derive(Debug)]
pub enum RenderError {
    MissingTitle,
    EmptySidenoteLabel,
    UnknownSidenote(String),
    SidenoteDisabled(String),
    Math(String),
    Highlighter(String),
}

impl fmt::Display for RenderError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RenderError::MissingTitle => write!(
                f,
                "missing title: provide a 'title' in front matter or start the body with '# Title'"
            ),
            RenderError::EmptySidenoteLabel => write!(f, "sidenote reference missing label"),
            RenderError::UnknownSidenote(label) => {
                write!(f, "sidenote reference [^{}] has no matching definition", label)
            }
            RenderError::SidenoteDisabled(label) => write!(
                f,
                "sidenote reference [^{}] found but sidenotes are not available here",
                label
            ),
            RenderError::Math(msg) => write!(f, "math rendering failed: {}", msg),
            RenderError::Highlighter(msg) => write!(f, "code highlighting failed: {}", msg),
        }
    }
}

impl std::error::Error for RenderError {}

/// A render error or warning enriched with source location information.
#[derive(Debug)]
pub struct RenderDiagnostic {
    pub error: RenderError,
    pub span: Option<Range<usize>>,
    pub source_id: usize,
    pub is_warning: bool,
}

impl RenderDiagnostic {
    /// Create a warning diagnostic with a source span.
    pub fn warning(error: RenderError, span: Range<usize>, source_id: usize) -> Self {
        RenderDiagnostic {
            error,
            span: Some(span),
            source_id,
            is_warning: true,
        }
    }

    pub fn fatal(error: RenderError, span: Option<Range<usize>>, source_id: usize) -> Self {
        RenderDiagnostic {
            error,
            span,
            source_id,
            is_warning: false,
        }
    }
}

impl From<RenderError> for RenderDiagnostic {
    fn from(error: RenderError) -> Self {
        RenderDiagnostic {
            error,
            span: None,
            source_id: 0,
            is_warning: false,
        }
    }
}

impl fmt::Display for RenderDiagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.error.fmt(f)
    }
}

impl std::error::Error for RenderDiagnostic {}
