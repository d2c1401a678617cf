use std::collections::HashMap;

use folio::harvest::LinkDefinition;

use crate::error::RenderError;
use crate::escape::{escape_attr, escape_text};
use crate::sidenote::SidenoteRegistry;

pub const EM_DASH_HTML: &str = "<span class=\"emdash-box\">&mdash;</span>";
pub const EN_DASH_HTML: &str = "&ndash;";

/// Shared state for rendering one text run: the document's link
/// definitions, plus the sidenote registry when sidenote references are
/// allowed in this position.
pub struct InlineContext<'a> {
    pub links: &'a HashMap<String, LinkDefinition>,
    pub sidenotes: Option<&'a mut SidenoteRegistry>,
}

/// Collapse a multi-line text run into a single line: trim each line, drop
/// blanks, join with single spaces.
pub fn collapse_text(value: &str) -> String {
    value
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

/// Render a text run to HTML.
///
/// A single left-to-right scan keeps a pending window of unprocessed plain
/// text; at each position the inline constructs are tried in order and the
/// first match consumes. Everything flushed through the plain path is
/// HTML-escaped and dash-rewritten. `allow_links` is off inside link text,
/// so links never nest.
pub fn render_inline(
    text: &str,
    cx: &mut InlineContext<'_>,
    allow_links: bool,
) -> Result<String, RenderError> {
    if text.is_empty() {
        return Ok(String::new());
    }

    let bytes = text.as_bytes();
    let links = cx.links;
    let mut out = String::new();
    let mut start = 0usize;
    let mut i = 0usize;

    while i < bytes.len() {
        match bytes[i] {
            b'`' => {
                flush(&mut out, text, &mut start, i);
                let code_start = i + 1;
                let (content, next) = match text[code_start..].find('`') {
                    Some(rel) => (&text[code_start..code_start + rel], code_start + rel + 1),
                    None => (&text[code_start..], bytes.len()),
                };
                out.push_str("<code>");
                out.push_str(&escape_text(content));
                out.push_str("</code>");
                i = next;
                start = i;
            }

            b'\\' => {
                flush(&mut out, text, &mut start, i);
                if let Some(next) = text[i + 1..].chars().next() {
                    let end = i + 1 + next.len_utf8();
                    out.push_str(&render_text_segment(&text[i + 1..end]));
                    i = end;
                    start = i;
                } else {
                    // Trailing lone backslash stays literal.
                    i = bytes.len();
                }
            }

            b'*' => {
                if bytes.get(i + 1) == Some(&b'*') {
                    if let Some(close) = find_delimiter(text, i + 2, "**") {
                        flush(&mut out, text, &mut start, i);
                        let inner = render_inline(&text[i + 2..close], cx, allow_links)?;
                        out.push_str("<strong>");
                        out.push_str(&inner);
                        out.push_str("</strong>");
                        i = close + 2;
                        start = i;
                    } else {
                        i += 2;
                    }
                } else if let Some(close) = find_delimiter(text, i + 1, "*") {
                    flush(&mut out, text, &mut start, i);
                    let inner = render_inline(&text[i + 1..close], cx, allow_links)?;
                    out.push_str("<em>");
                    out.push_str(&inner);
                    out.push_str("</em>");
                    i = close + 1;
                    start = i;
                } else {
                    i += 1;
                }
            }

            b'~' if bytes.get(i + 1) == Some(&b'~') => {
                if let Some(close) = find_delimiter(text, i + 2, "~~") {
                    flush(&mut out, text, &mut start, i);
                    let inner = render_inline(&text[i + 2..close], cx, allow_links)?;
                    out.push_str("<del>");
                    out.push_str(&inner);
                    out.push_str("</del>");
                    i = close + 2;
                    start = i;
                } else {
                    i += 2;
                }
            }

            b'=' if bytes.get(i + 1) == Some(&b'=') => {
                if let Some(close) = find_delimiter(text, i + 2, "==") {
                    flush(&mut out, text, &mut start, i);
                    let inner = render_inline(&text[i + 2..close], cx, allow_links)?;
                    out.push_str("<mark>");
                    out.push_str(&inner);
                    out.push_str("</mark>");
                    i = close + 2;
                    start = i;
                } else {
                    i += 2;
                }
            }

            b'[' => {
                if allow_links
                    && let Some(consumed) = try_link(text, i, links, &mut out, &mut start)?
                {
                    i = consumed;
                    continue;
                }
                // Sidenote reference [^label].
                if bytes.get(i + 1) == Some(&b'^')
                    && let Some(close) = find_closing(text, i + 2, b']')
                {
                    let label = text[i + 2..close].trim();
                    if label.is_empty() {
                        i += 1;
                        continue;
                    }
                    let Some(registry) = cx.sidenotes.as_deref_mut() else {
                        return Err(RenderError::SidenoteDisabled(label.to_string()));
                    };
                    flush(&mut out, text, &mut start, i);
                    out.push_str(&registry.render_reference(label, links)?);
                    i = close + 1;
                    start = i;
                    continue;
                }
                i += 1;
            }

            b'<' => {
                if let Some(rel) = text[i + 1..].find('>') {
                    let inner = &text[i + 1..i + 1 + rel];
                    if is_autolink(inner) {
                        flush(&mut out, text, &mut start, i);
                        out.push_str(&format!(
                            "<a class=\"highlight\" href=\"{}\">{}</a>",
                            escape_attr(inner),
                            escape_text(inner)
                        ));
                        i = i + 1 + rel + 1;
                        start = i;
                        continue;
                    }
                }
                i += 1;
            }

            _ => i += 1,
        }
    }

    flush(&mut out, text, &mut start, text.len());
    Ok(out)
}

/// Try the inline and reference link forms at an opening `[`.
/// Returns the position after a consumed link, or `None` to fall through
/// (unresolved reference labels become ordinary text).
fn try_link(
    text: &str,
    open: usize,
    links: &HashMap<String, LinkDefinition>,
    out: &mut String,
    start: &mut usize,
) -> Result<Option<usize>, RenderError> {
    let bytes = text.as_bytes();
    let Some(close) = find_closing(text, open + 1, b']') else {
        return Ok(None);
    };

    // Inline link [text](url).
    if bytes.get(close + 1) == Some(&b'(')
        && let Some(end) = find_closing(text, close + 2, b')')
    {
        flush(out, text, start, open);
        let label = render_link_text(&text[open + 1..close], links)?;
        out.push_str(&format!(
            "<a class=\"highlight\" href=\"{}\">{}</a>",
            escape_attr(&text[close + 2..end]),
            label
        ));
        *start = end + 1;
        return Ok(Some(end + 1));
    }

    // Reference link [text][label]; an empty label defaults to the text.
    if bytes.get(close + 1) == Some(&b'[')
        && let Some(end) = find_closing(text, close + 2, b']')
    {
        let explicit = text[close + 2..end].trim();
        let key = if explicit.is_empty() {
            text[open + 1..close].trim().to_lowercase()
        } else {
            explicit.to_lowercase()
        };
        if let Some(def) = links.get(&key) {
            flush(out, text, start, open);
            let label = render_link_text(&text[open + 1..close], links)?;
            out.push_str(&format!("<a class=\"highlight\" href=\"{}\"", escape_attr(&def.url)));
            if let Some(title) = &def.title {
                out.push_str(&format!(" title=\"{}\"", escape_attr(title)));
            }
            out.push('>');
            out.push_str(&label);
            out.push_str("</a>");
            *start = end + 1;
            return Ok(Some(end + 1));
        }
    }

    Ok(None)
}

/// Link text renders with link recognition off and no sidenote registry.
fn render_link_text(
    text: &str,
    links: &HashMap<String, LinkDefinition>,
) -> Result<String, RenderError> {
    let mut cx = InlineContext {
        links,
        sidenotes: None,
    };
    render_inline(text, &mut cx, false)
}

/// Escape a plain-text segment and apply dash rewriting.
pub fn render_text_segment(segment: &str) -> String {
    rewrite_dashes(&escape_text(segment))
}

/// Runs of exactly three hyphens (or an em-dash char) become the styled
/// em-dash element; runs of exactly two (or an en-dash char) become the
/// dash entity. Other run lengths pass through untouched, so the rule is
/// idempotent and `---` never half-matches as `--`.
fn rewrite_dashes(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut chars = text.chars().peekable();
    while let Some(c) = chars.next() {
        match c {
            '-' => {
                let mut run = 1usize;
                while chars.peek() == Some(&'-') {
                    chars.next();
                    run += 1;
                }
                match run {
                    3 => out.push_str(EM_DASH_HTML),
                    2 => out.push_str(EN_DASH_HTML),
                    _ => {
                        for _ in 0..run {
                            out.push('-');
                        }
                    }
                }
            }
            '\u{2014}' => out.push_str(EM_DASH_HTML),
            '\u{2013}' => out.push_str(EN_DASH_HTML),
            _ => out.push(c),
        }
    }
    out
}

fn flush(out: &mut String, text: &str, start: &mut usize, end: usize) {
    if *start < end {
        out.push_str(&render_text_segment(&text[*start..end]));
    }
    *start = end;
}

/// Find a closing byte, honouring backslash escapes.
fn find_closing(text: &str, mut i: usize, closing: u8) -> Option<usize> {
    let bytes = text.as_bytes();
    while i < bytes.len() {
        if bytes[i] == b'\\' {
            i += 2;
            continue;
        }
        if bytes[i] == closing {
            return Some(i);
        }
        i += 1;
    }
    None
}

/// Find a multi-byte closing delimiter, honouring backslash escapes.
fn find_delimiter(text: &str, mut i: usize, delim: &str) -> Option<usize> {
    let bytes = text.as_bytes();
    let d = delim.as_bytes();
    while i + d.len() <= bytes.len() {
        if bytes[i] == b'\\' {
            i += 2;
            continue;
        }
        if &bytes[i..i + d.len()] == d {
            return Some(i);
        }
        i += 1;
    }
    None
}

fn is_autolink(inner: &str) -> bool {
    (inner.starts_with("http://")
        || inner.starts_with("https://")
        || inner.starts_with("mailto:"))
        && !inner.chars().any(char::is_whitespace)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dash_rewriting_is_order_sensitive_and_idempotent() {
        let once = rewrite_dashes("A--B---C");
        assert_eq!(once, format!("A{}B{}C", EN_DASH_HTML, EM_DASH_HTML));
        // Already-rewritten output survives a second pass untouched.
        assert_eq!(rewrite_dashes(&once), once);
    }

    #[test]
    fn other_dash_run_lengths_pass_through() {
        assert_eq!(rewrite_dashes("a-b"), "a-b");
        assert_eq!(rewrite_dashes("x----y"), "x----y");
    }

    #[test]
    fn collapse_text_joins_trimmed_lines() {
        assert_eq!(collapse_text("  a \n\n  b\nc  "), "a b c");
        assert_eq!(collapse_text(""), "");
    }
}
