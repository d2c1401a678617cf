use std::ops::Range;
use std::sync::LazyLock;

use regex::Regex;

use crate::block::{Block, BlockKind, ListBlock, ListItem, ListKind, TableBlock};
use crate::lines::Line;
use crate::parser::error::ParseError;

static ORDERED_ITEM_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(\d+)\.\s+(.*)$").expect("ordered list marker regex"));

static IMAGE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"^!\[(?P<alt>.*?)\]\((?P<src>\S+?)(?:\s+"(?P<title>[^"]*)")?\)$"#)
        .expect("image block regex")
});

static TABLE_DIVIDER_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\s*\|?\s*:?-{3,}:?\s*(\|\s*:?-{3,}:?\s*)+\|?\s*$").expect("table divider regex")
});

static CAPTION_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^(?:table|caption)\s*:\s*(?P<text>.+)$").expect("table caption regex")
});

// ---------------------------------------------------------------------------
// Public API
// ---------------------------------------------------------------------------

/// The scanner's output: typed blocks in source order, the extracted `# `
/// title, and any hand-authored rail chunks.
#[derive(Debug)]
pub struct ScanResult {
    pub blocks: Vec<Block>,
    pub title: Option<String>,
    pub rail_chunks: Vec<String>,
}

/// Scan harvested body lines into an ordered block sequence.
pub fn scan_blocks(lines: &[Line], file_id: usize) -> Result<ScanResult, ParseError> {
    let mut scanner = Scanner {
        lines,
        file_id,
        cursor: 0,
        blocks: Vec::new(),
        title: None,
        rail_chunks: Vec::new(),
        pending_caption: None,
    };
    scanner.run()?;
    Ok(ScanResult {
        blocks: scanner.blocks,
        title: scanner.title,
        rail_chunks: scanner.rail_chunks,
    })
}

// ---------------------------------------------------------------------------
// Scanner state
// ---------------------------------------------------------------------------

struct Scanner<'a> {
    lines: &'a [Line],
    file_id: usize,
    cursor: usize,
    blocks: Vec<Block>,
    title: Option<String>,
    rail_chunks: Vec<String>,
    /// A `Table:`/`Caption:` line seen just before a table start.
    pending_caption: Option<String>,
}

impl<'a> Scanner<'a> {
    /// Classification runs in fixed priority order; the first match wins
    /// and decides how many lines are consumed.
    fn run(&mut self) -> Result<(), ParseError> {
        while self.cursor < self.lines.len() {
            let line = &self.lines[self.cursor];
            let stripped = line.text.trim();

            if stripped.is_empty() {
                self.cursor += 1;
                continue;
            }
            if stripped.starts_with('<') {
                self.consume_raw_html();
                continue;
            }
            if stripped.starts_with(":::rail-right") {
                self.consume_rail()?;
                continue;
            }
            if let Some(caps) = CAPTION_RE.captures(stripped) {
                let mut next = self.cursor + 1;
                while next < self.lines.len() && self.lines[next].is_blank() {
                    next += 1;
                }
                if self.is_table_start(next) {
                    self.pending_caption = Some(caps["text"].trim().to_string());
                    self.cursor += 1;
                    continue;
                }
            }
            if stripped == r"\[" {
                self.consume_math()?;
                continue;
            }
            if stripped.starts_with('#') {
                self.consume_heading()?;
                continue;
            }
            if is_horizontal_rule(stripped) {
                self.push(BlockKind::HorizontalRule, line.span.clone());
                self.cursor += 1;
                continue;
            }
            if stripped.starts_with('>') {
                self.consume_blockquote();
                continue;
            }
            if is_list_start(&line.text) {
                self.consume_list();
                continue;
            }
            if stripped.starts_with("```") {
                self.consume_code()?;
                continue;
            }
            if IMAGE_RE.is_match(stripped) {
                self.consume_image();
                continue;
            }
            if self.is_table_start(self.cursor) {
                self.consume_table()?;
                continue;
            }
            self.consume_paragraph();
        }
        Ok(())
    }

    fn push(&mut self, kind: BlockKind, span: Range<usize>) {
        self.blocks.push(Block { kind, span });
    }

    /// Contiguous `<`-leading lines pass through untouched; the inline
    /// renderer never sees them.
    fn consume_raw_html(&mut self) {
        let start = self.lines[self.cursor].span.start;
        let mut end = start;
        let mut raw: Vec<String> = Vec::new();
        while self.cursor < self.lines.len() {
            let line = &self.lines[self.cursor];
            let stripped = line.text.trim();
            if stripped.is_empty() || !stripped.starts_with('<') {
                break;
            }
            raw.push(line.text.clone());
            end = line.span.end;
            self.cursor += 1;
        }
        self.push(BlockKind::RawHtml(raw.join("\n")), start..end);
    }

    fn consume_rail(&mut self) -> Result<(), ParseError> {
        let open = self.lines[self.cursor].span.clone();
        self.cursor += 1;
        let mut chunk: Vec<String> = Vec::new();
        while self.cursor < self.lines.len() {
            let line = &self.lines[self.cursor];
            if line.text.trim() == ":::" {
                self.cursor += 1;
                self.rail_chunks.push(chunk.join("\n").trim().to_string());
                return Ok(());
            }
            chunk.push(line.text.clone());
            self.cursor += 1;
        }
        Err(
            ParseError::new("unterminated :::rail-right block", open, self.file_id)
                .with_note("close the rail block with a ':::' line"),
        )
    }

    fn consume_math(&mut self) -> Result<(), ParseError> {
        let open = self.lines[self.cursor].span.clone();
        let body_start = self.cursor + 1;
        let mut close = body_start;
        while close < self.lines.len() && self.lines[close].text.trim() != r"\]" {
            close += 1;
        }
        if close >= self.lines.len() {
            return Err(ParseError::new(
                r"unterminated math block (missing '\]')",
                open,
                self.file_id,
            ));
        }
        let tex: Vec<&str> = self.lines[body_start..close]
            .iter()
            .map(|l| l.text.as_str())
            .collect();
        let span = open.start..self.lines[close].span.end;
        self.cursor = close + 1;
        self.push(BlockKind::Math(tex.join("\n").trim().to_string()), span);
        Ok(())
    }

    fn consume_heading(&mut self) -> Result<(), ParseError> {
        let line = &self.lines[self.cursor];
        let stripped = line.text.trim();
        let span = line.span.clone();

        if let Some(rest) = stripped.strip_prefix("### ") {
            self.push(
                BlockKind::Heading {
                    level: 3,
                    text: rest.trim().to_string(),
                },
                span,
            );
        } else if let Some(rest) = stripped.strip_prefix("## ") {
            self.push(
                BlockKind::Heading {
                    level: 2,
                    text: rest.trim().to_string(),
                },
                span,
            );
        } else if stripped == "#" {
            return Err(ParseError::new(
                "title heading cannot be empty",
                span,
                self.file_id,
            ));
        } else if let Some(rest) = stripped.strip_prefix("# ") {
            let text = rest.trim();
            if text.is_empty() {
                return Err(ParseError::new(
                    "title heading cannot be empty",
                    span,
                    self.file_id,
                ));
            }
            if self.title.is_some() {
                return Err(ParseError::new(
                    "multiple '# ' headings found; only one title heading is allowed",
                    span,
                    self.file_id,
                ));
            }
            self.title = Some(text.to_string());
        } else {
            return Err(
                ParseError::new("unsupported heading level", span, self.file_id).with_note(
                    "only a single '# ' title plus '##' and '###' headings are allowed",
                ),
            );
        }
        self.cursor += 1;
        Ok(())
    }

    /// `>`-prefixed lines, one `>` and one following space stripped per
    /// line, re-split into paragraphs on blank quote lines.
    fn consume_blockquote(&mut self) {
        let start = self.lines[self.cursor].span.start;
        let mut end = start;
        let mut quote_lines: Vec<String> = Vec::new();
        while self.cursor < self.lines.len() {
            let line = &self.lines[self.cursor];
            let lstripped = line.text.trim_start();
            let Some(rest) = lstripped.strip_prefix('>') else {
                break;
            };
            let content = rest.strip_prefix(' ').unwrap_or(rest);
            quote_lines.push(content.to_string());
            end = line.span.end;
            self.cursor += 1;
        }

        let mut paragraphs: Vec<String> = Vec::new();
        let mut current: Vec<String> = Vec::new();
        for q in quote_lines {
            if q.trim().is_empty() {
                if !current.is_empty() {
                    paragraphs.push(current.join("\n"));
                    current.clear();
                }
            } else {
                current.push(q);
            }
        }
        if !current.is_empty() {
            paragraphs.push(current.join("\n"));
        }
        self.push(BlockKind::Blockquote { paragraphs }, start..end);
    }

    /// Only called when `is_list_start` matched, so at least one item is
    /// consumed and the cursor always advances.
    fn consume_list(&mut self) {
        let first = &self.lines[self.cursor];
        let start = first.span.start;
        let base = indent_width(&first.text);
        let kind = match list_marker(&first.text[base..]) {
            Some((kind, _)) => kind,
            None => ListKind::Unordered,
        };
        let list = self.parse_list(base, kind);
        let end = self.lines[self.cursor - 1].span.end;
        self.push(BlockKind::List(list), start..end);
    }

    /// Recursive list parsing. `base` is the list's indentation; a strictly
    /// deeper line that itself begins a list item (of either kind) opens a
    /// nested list owned by the item just produced. The region ends at a
    /// blank line, a dedent below base, or a non-item line.
    fn parse_list(&mut self, base: usize, kind: ListKind) -> ListBlock {
        let mut items: Vec<ListItem> = Vec::new();

        while self.cursor < self.lines.len() {
            let line = &self.lines[self.cursor];
            if line.is_blank() {
                break;
            }
            let indent = indent_width(&line.text);
            if indent < base {
                break;
            }
            let rest = &line.text[indent..];

            if indent == base {
                let Some((marker_kind, text)) = list_marker(rest) else {
                    break;
                };
                if marker_kind != kind {
                    break;
                }
                let (task, text) = split_task(text);
                items.push(ListItem {
                    text: text.to_string(),
                    task,
                    nested: None,
                });
                self.cursor += 1;
                continue;
            }

            let Some((nested_kind, _)) = list_marker(rest) else {
                break;
            };
            let Some(owner) = items.last_mut() else {
                break;
            };
            if owner.nested.is_some() {
                break;
            }
            owner.nested = Some(self.parse_list(indent, nested_kind));
        }

        ListBlock { kind, items }
    }

    fn consume_code(&mut self) -> Result<(), ParseError> {
        let open = &self.lines[self.cursor];
        let open_span = open.span.clone();
        let tag = open.text.trim().trim_start_matches('`').trim();
        let language = if tag.is_empty() {
            "text".to_string()
        } else {
            tag.to_string()
        };

        let body_start = self.cursor + 1;
        let mut close = body_start;
        while close < self.lines.len() && !self.lines[close].text.trim().starts_with("```") {
            close += 1;
        }
        if close >= self.lines.len() {
            return Err(ParseError::new(
                "unterminated code fence block",
                open_span,
                self.file_id,
            ));
        }
        let body: Vec<&str> = self.lines[body_start..close]
            .iter()
            .map(|l| l.text.as_str())
            .collect();
        let span = open_span.start..self.lines[close].span.end;
        self.cursor = close + 1;
        self.push(
            BlockKind::Code {
                language,
                body: body.join("\n"),
            },
            span,
        );
        Ok(())
    }

    fn consume_image(&mut self) {
        let line = &self.lines[self.cursor];
        let Some(caps) = IMAGE_RE.captures(line.text.trim()) else {
            self.cursor += 1;
            return;
        };
        self.push(
            BlockKind::Image {
                alt: caps["alt"].trim().to_string(),
                src: caps["src"].trim().to_string(),
                caption: caps
                    .name("title")
                    .map(|m| m.as_str().trim().to_string())
                    .unwrap_or_default(),
            },
            line.span.clone(),
        );
        self.cursor += 1;
    }

    /// A table starts where the current line contains a pipe and the next
    /// is a divider of three-or-more dashes per column.
    fn is_table_start(&self, index: usize) -> bool {
        index + 1 < self.lines.len()
            && self.lines[index].text.contains('|')
            && TABLE_DIVIDER_RE.is_match(self.lines[index + 1].text.trim())
    }

    fn consume_table(&mut self) -> Result<(), ParseError> {
        let header_line = &self.lines[self.cursor];
        let start = header_line.span.start;
        let headers = split_cells(&header_line.text);

        let divider = &self.lines[self.cursor + 1];
        if !TABLE_DIVIDER_RE.is_match(divider.text.trim()) {
            return Err(ParseError::new(
                "invalid table divider line",
                divider.span.clone(),
                self.file_id,
            ));
        }
        let mut end = divider.span.end;
        self.cursor += 2;

        let mut rows: Vec<Vec<String>> = Vec::new();
        while self.cursor < self.lines.len() {
            let line = &self.lines[self.cursor];
            if line.is_blank() || !line.text.contains('|') {
                break;
            }
            rows.push(normalize_cells(split_cells(&line.text), headers.len()));
            end = line.span.end;
            self.cursor += 1;
        }

        // Trailing caption form; the pre-table form wins when both appear.
        let mut caption = self.pending_caption.take().unwrap_or_default();
        let mut probe = self.cursor;
        while probe < self.lines.len() && self.lines[probe].is_blank() {
            probe += 1;
        }
        if probe < self.lines.len()
            && let Some(caps) = CAPTION_RE.captures(self.lines[probe].text.trim())
        {
            if caption.is_empty() {
                caption = caps["text"].trim().to_string();
            }
            end = self.lines[probe].span.end;
            self.cursor = probe + 1;
        }

        self.push(
            BlockKind::Table(TableBlock {
                headers,
                rows,
                caption,
            }),
            start..end,
        );
        Ok(())
    }

    fn consume_paragraph(&mut self) {
        let start = self.lines[self.cursor].span.start;
        let mut end = start;
        let mut para: Vec<String> = Vec::new();
        while self.cursor < self.lines.len() {
            let line = &self.lines[self.cursor];
            if line.is_blank() {
                break;
            }
            if !para.is_empty() && self.is_block_start(self.cursor) {
                break;
            }
            para.push(line.text.clone());
            end = line.span.end;
            self.cursor += 1;
        }
        self.push(BlockKind::Paragraph(para.join("\n")), start..end);
    }

    /// Whether the line at `index` begins any recognized block type; used
    /// to terminate paragraph accumulation.
    fn is_block_start(&self, index: usize) -> bool {
        let stripped = self.lines[index].text.trim();
        if stripped.is_empty() {
            return false;
        }
        stripped.starts_with('<')
            || stripped.starts_with(":::rail-right")
            || stripped == r"\["
            || stripped.starts_with('#')
            || is_horizontal_rule(stripped)
            || stripped.starts_with('>')
            || is_list_start(&self.lines[index].text)
            || stripped.starts_with("```")
            || IMAGE_RE.is_match(stripped)
            || self.is_table_start(index)
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn indent_width(text: &str) -> usize {
    text.bytes().take_while(|&b| b == b' ').count()
}

/// A horizontal rule is a line of three-or-more asterisks or underscores
/// and nothing else.
fn is_horizontal_rule(stripped: &str) -> bool {
    stripped.len() >= 3
        && (stripped.bytes().all(|b| b == b'*') || stripped.bytes().all(|b| b == b'_'))
}

/// Whether a raw line opens a list: a marker right after its space indent.
fn is_list_start(text: &str) -> bool {
    list_marker(&text[indent_width(text)..]).is_some()
}

/// Match a list item marker at the start of an indent-stripped line,
/// returning the item kind and the text after the marker.
fn list_marker(text: &str) -> Option<(ListKind, &str)> {
    if let Some(rest) = text.strip_prefix("- ") {
        return Some((ListKind::Unordered, rest));
    }
    let caps = ORDERED_ITEM_RE.captures(text)?;
    let rest = caps.get(2).map(|m| m.as_str()).unwrap_or_default();
    Some((ListKind::Ordered, rest))
}

/// Split a task-checkbox prefix from item text, if present.
fn split_task(text: &str) -> (Option<bool>, &str) {
    if let Some(rest) = text.strip_prefix("[ ] ") {
        (Some(false), rest.trim_start())
    } else if let Some(rest) = text.strip_prefix("[x] ") {
        (Some(true), rest.trim_start())
    } else {
        (None, text)
    }
}

fn split_cells(line: &str) -> Vec<String> {
    let working = line.trim().trim_matches('|');
    working.split('|').map(|cell| cell.trim().to_string()).collect()
}

fn normalize_cells(mut cells: Vec<String>, width: usize) -> Vec<String> {
    cells.resize(width, String::new());
    cells
}
