use std::ops::Range;

/// A typed block of post content.
/// Blocks are produced and rendered in source order; the single `# ` title
/// is extracted into the post instead of appearing here.
#[derive(Debug, Clone, PartialEq)]
pub struct Block {
    pub kind: BlockKind,
    /// Byte span in source for error reporting.
    pub span: Range<usize>,
}

/// One variant per block kind, each carrying only its own fields.
#[derive(Debug, Clone, PartialEq)]
pub enum BlockKind {
    /// `##` or `###` heading. Level is always 2 or 3.
    Heading { level: u8, text: String },
    /// Consecutive plain lines, joined with newlines.
    Paragraph(String),
    /// `- ` or `<n>. ` items, possibly nested.
    List(ListBlock),
    /// `>`-prefixed lines, re-split into paragraphs on inner blank lines.
    /// Each paragraph keeps its lines joined with newlines.
    Blockquote { paragraphs: Vec<String> },
    /// Fenced code. The language tag defaults to "text" when omitted.
    Code { language: String, body: String },
    /// A standalone `![alt](src "title")` line; the title becomes a caption.
    Image {
        alt: String,
        src: String,
        caption: String,
    },
    Table(TableBlock),
    /// Display math between `\[` and `\]` lines.
    Math(String),
    /// Verbatim passthrough; bypasses inline rendering entirely.
    RawHtml(String),
    HorizontalRule,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ListKind {
    Unordered,
    Ordered,
}

/// A list owns its items; an item owns at most one nested list. The kind of
/// a nested list comes from its own marker, independent of the parent.
#[derive(Debug, Clone, PartialEq)]
pub struct ListBlock {
    pub kind: ListKind,
    pub items: Vec<ListItem>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ListItem {
    pub text: String,
    /// `Some(done)` when the item text began with a `[ ]` / `[x]` checkbox.
    pub task: Option<bool>,
    pub nested: Option<ListBlock>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TableBlock {
    pub headers: Vec<String>,
    /// Every row is normalized to the header's width.
    pub rows: Vec<Vec<String>>,
    pub caption: String,
}
