pub mod article;
pub mod error;
pub mod escape;
pub mod highlight;
pub mod inline;
pub mod math;
pub mod sidenote;

pub use article::render_post;
pub use error::{CollaboratorError, RenderDiagnostic, RenderError};
pub use highlight::{CommandHighlighter, Highlighter, PlainHighlighter};
pub use math::{CommandMathRenderer, MathBatch, MathRenderer};
pub use sidenote::SidenoteRegistry;
