use std::ops::Range;

use folio::Post;
use folio::block::{BlockKind, ListBlock, ListKind, TableBlock};
use folio::frontmatter::Metadata;

use crate::error::{RenderDiagnostic, RenderError};
use crate::escape::{escape_attr, escape_text};
use crate::highlight::{self, Highlighter};
use crate::inline::{self, InlineContext};
use crate::math::{MathBatch, MathRenderer};
use crate::sidenote::SidenoteRegistry;

/// Indent level of the rendered blocks inside the article shell.
const CONTENT_INDENT: usize = 3;

/// Render a parsed post into its article HTML fragment.
///
/// Resolves the title and subtitle variants, renders every block (with one
/// batched math call for the whole document), and wraps the result in the
/// article shell. Returns the HTML plus any warnings collected along the
/// way; highlighter failures degrade to escaped output and warn rather
/// than fail.
pub fn render_post(
    post: &Post,
    highlighter: &dyn Highlighter,
    math: &mut dyn MathRenderer,
) -> Result<(String, Vec<RenderDiagnostic>), RenderDiagnostic> {
    let title = resolve_title(post)
        .map_err(|e| RenderDiagnostic::fatal(e, None, post.source_id))?;
    let mut subtitles = collect_subtitle_variants(&post.metadata);
    if subtitles.is_empty() {
        subtitles.push(title.clone());
    }

    let mut registry = SidenoteRegistry::new(&post.footnotes);
    let mut warnings = Vec::new();
    let block_lines = render_blocks(post, &mut registry, highlighter, math, &mut warnings)?;

    let mut attr_parts = vec![format!("data-page-title=\"{}\"", escape_attr(&title))];
    for (idx, variant) in subtitles.iter().enumerate() {
        attr_parts.push(format!(
            "data-page-subtitle-{}=\"{}\"",
            idx,
            escape_attr(variant)
        ));
    }

    let mut article: Vec<String> = Vec::new();
    article.push(format!(
        "<article class=\"writing-post\" {}>",
        attr_parts.join(" ")
    ));
    article.push("    <div class=\"writing-post__layout\">".to_string());
    article.push("        <div class=\"writing-post__rail\">".to_string());
    article.push("            <nav class=\"writing-toc\" data-toc></nav>".to_string());
    article.push("        </div>".to_string());
    article.push("        <div class=\"writing-post__content\" data-toc-intro>".to_string());
    article.extend(block_lines);
    article.push("        </div>".to_string());

    // Hand-authored rail content first, then the generated sidenote rail.
    let hand_rail = post
        .rail_chunks
        .iter()
        .map(|chunk| chunk.trim())
        .filter(|chunk| !chunk.is_empty())
        .collect::<Vec<_>>()
        .join("\n");
    let generated_rail = if registry.has_notes() {
        registry.render_rail_spans()
    } else {
        String::new()
    };
    let combined_rail = [hand_rail.as_str(), generated_rail.trim()]
        .iter()
        .filter(|part| !part.is_empty())
        .cloned()
        .collect::<Vec<_>>()
        .join("\n");

    if combined_rail.is_empty() {
        article.push("        <div class=\"writing-post__rail-right\"></div>".to_string());
    } else {
        article.push("        <div class=\"writing-post__rail-right\">".to_string());
        for line in combined_rail.lines() {
            if line.is_empty() {
                article.push(String::new());
            } else {
                article.push(format!("            {}", line));
            }
        }
        article.push("        </div>".to_string());
    }
    article.push("    </div>".to_string());
    article.push("</article>".to_string());

    Ok((article.join("\n") + "\n", warnings))
}

/// Explicit metadata title wins over the extracted `# ` heading; one of the
/// two must exist.
fn resolve_title(post: &Post) -> Result<String, RenderError> {
    let explicit = post
        .metadata
        .get("title")
        .map(str::trim)
        .filter(|t| !t.is_empty());
    let extracted = post
        .heading_title
        .as_deref()
        .map(str::trim)
        .filter(|t| !t.is_empty());
    explicit
        .or(extracted)
        .map(str::to_string)
        .ok_or(RenderError::MissingTitle)
}

/// Ordered subtitle variants: numeric `subtitle_<N>` keys first
/// (case-insensitive, sorted by N), else the fixed fallback keys, else the
/// date. The caller substitutes the title when nothing is found.
fn collect_subtitle_variants(metadata: &Metadata) -> Vec<String> {
    let mut explicit: Vec<(usize, String)> = Vec::new();
    for (key, value) in metadata.iter() {
        let lower = key.to_lowercase();
        if let Some(n) = lower
            .strip_prefix("subtitle_")
            .and_then(|rest| rest.parse::<usize>().ok())
        {
            let text = value.trim();
            if !text.is_empty() {
                explicit.push((n, text.to_string()));
            }
        }
    }
    if !explicit.is_empty() {
        explicit.sort_by_key(|(n, _)| *n);
        return explicit.into_iter().map(|(_, text)| text).collect();
    }

    let mut fallback = Vec::new();
    for key in ["subtitle_long", "subtitle_short", "subtitle"] {
        if let Some(value) = metadata.get(key) {
            let text = value.trim();
            if !text.is_empty() {
                fallback.push(text.to_string());
            }
        }
    }
    if !fallback.is_empty() {
        return fallback;
    }

    match metadata.get("date").map(str::trim) {
        Some(date) if !date.is_empty() => vec![date.to_string()],
        _ => Vec::new(),
    }
}

fn render_blocks(
    post: &Post,
    registry: &mut SidenoteRegistry,
    highlighter: &dyn Highlighter,
    math: &mut dyn MathRenderer,
    warnings: &mut Vec<RenderDiagnostic>,
) -> Result<Vec<String>, RenderDiagnostic> {
    let indent = " ".repeat(CONTENT_INDENT * 4);
    let mut lines: Vec<String> = Vec::new();

    // One batched math call per document.
    let math_exprs: Vec<String> = post
        .blocks
        .iter()
        .filter_map(|b| match &b.kind {
            BlockKind::Math(tex) => Some(tex.clone()),
            _ => None,
        })
        .collect();
    let first_math_span = post
        .blocks
        .iter()
        .find(|b| matches!(b.kind, BlockKind::Math(_)))
        .map(|b| b.span.clone());
    let batch = if math_exprs.is_empty() {
        MathBatch::default()
    } else {
        math.render_batch(&math_exprs).map_err(|e| {
            RenderDiagnostic::fatal(
                RenderError::Math(e.0),
                first_math_span.clone(),
                post.source_id,
            )
        })?
    };
    if batch.fragments.len() != math_exprs.len() {
        return Err(RenderDiagnostic::fatal(
            RenderError::Math(format!(
                "renderer returned {} fragments for {} expressions",
                batch.fragments.len(),
                math_exprs.len()
            )),
            first_math_span,
            post.source_id,
        ));
    }
    let mut math_index = 0usize;
    let mut cache_pending = !batch.cache.is_empty();

    for block in &post.blocks {
        let span = &block.span;
        match &block.kind {
            BlockKind::Paragraph(text) => {
                let html = inline_html(&inline::collapse_text(text), post, registry, span)?;
                lines.push(format!("{}<p>{}</p>", indent, html));
            }

            BlockKind::Heading { level, text } => {
                let html = inline_html(text.trim(), post, registry, span)?;
                lines.push(format!("{}<h{lvl}>{}</h{lvl}>", indent, html, lvl = level));
            }

            BlockKind::List(list) => {
                render_list(list, CONTENT_INDENT, &mut lines, post, registry, span)?;
            }

            BlockKind::Blockquote { paragraphs } => {
                lines.push(format!("{}<blockquote>", indent));
                for paragraph in paragraphs {
                    let html =
                        inline_html(&inline::collapse_text(paragraph), post, registry, span)?;
                    lines.push(format!("{}    <p>{}</p>", indent, html));
                }
                lines.push(format!("{}</blockquote>", indent));
            }

            BlockKind::Code { language, body } => {
                let trimmed = body.trim_end_matches('\n');
                let highlighted = match highlighter.highlight(trimmed, language) {
                    Ok(html) => html,
                    Err(err) => {
                        warnings.push(RenderDiagnostic::warning(
                            RenderError::Highlighter(err.0),
                            span.clone(),
                            post.source_id,
                        ));
                        escape_text(trimmed)
                    }
                };
                let html = highlight::format_code_block(language, &highlighted);
                lines.extend(indent_block(&html, CONTENT_INDENT, false));
            }

            BlockKind::RawHtml(text) => {
                lines.extend(text.lines().map(String::from));
            }

            BlockKind::Image { alt, src, caption } => {
                let src = escape_attr(src);
                let alt = escape_attr(alt);
                if caption.is_empty() {
                    lines.push(format!("{}<img src=\"{}\" alt=\"{}\">", indent, src, alt));
                } else {
                    let caption_html = inline_html(caption, post, registry, span)?;
                    lines.push(format!("{}<figure>", indent));
                    lines.push(format!(
                        "{}    <img src=\"{}\" alt=\"{}\">",
                        indent, src, alt
                    ));
                    lines.push(format!(
                        "{}    <figcaption>{}</figcaption>",
                        indent, caption_html
                    ));
                    lines.push(format!("{}</figure>", indent));
                }
            }

            BlockKind::Table(table) => {
                render_table(table, &mut lines, post, registry, span)?;
            }

            BlockKind::Math(_) => {
                let wrapped = format!(
                    "<div class=\"math-display\">{}</div>",
                    batch.fragments[math_index]
                );
                math_index += 1;
                let mut block_lines = indent_block(&wrapped, CONTENT_INDENT, true);
                if cache_pending {
                    let mut with_cache = indent_block(&batch.cache, CONTENT_INDENT, true);
                    with_cache.append(&mut block_lines);
                    block_lines = with_cache;
                    cache_pending = false;
                }
                lines.extend(block_lines);
            }

            BlockKind::HorizontalRule => {
                lines.push(format!("{}<hr>", indent));
            }
        }
    }

    Ok(lines)
}

fn render_list(
    list: &ListBlock,
    level: usize,
    lines: &mut Vec<String>,
    post: &Post,
    registry: &mut SidenoteRegistry,
    span: &Range<usize>,
) -> Result<(), RenderDiagnostic> {
    let indent = " ".repeat(level * 4);
    let item_indent = " ".repeat((level + 1) * 4);
    let tag = match list.kind {
        ListKind::Unordered => "ul",
        ListKind::Ordered => "ol",
    };

    lines.push(format!("{}<{}>", indent, tag));
    for item in &list.items {
        let html = inline_html(&inline::collapse_text(&item.text), post, registry, span)?;
        let open = match item.task {
            Some(true) => format!(
                "<li class=\"task-item task-item--done\"><input type=\"checkbox\" checked disabled> {}",
                html
            ),
            Some(false) => format!(
                "<li class=\"task-item\"><input type=\"checkbox\" disabled> {}",
                html
            ),
            None => format!("<li>{}", html),
        };
        match &item.nested {
            None => lines.push(format!("{}{}</li>", item_indent, open)),
            Some(nested) => {
                lines.push(format!("{}{}", item_indent, open));
                render_list(nested, level + 2, lines, post, registry, span)?;
                lines.push(format!("{}</li>", item_indent));
            }
        }
    }
    lines.push(format!("{}</{}>", indent, tag));
    Ok(())
}

fn render_table(
    table: &TableBlock,
    lines: &mut Vec<String>,
    post: &Post,
    registry: &mut SidenoteRegistry,
    span: &Range<usize>,
) -> Result<(), RenderDiagnostic> {
    let indent = " ".repeat(CONTENT_INDENT * 4);
    lines.push(format!("{}<table>", indent));
    if !table.caption.is_empty() {
        let caption = inline_html(&table.caption, post, registry, span)?;
        lines.push(format!("{}    <caption>{}</caption>", indent, caption));
    }
    if !table.headers.is_empty() {
        lines.push(format!("{}    <thead>", indent));
        lines.push(format!("{}        <tr>", indent));
        for cell in &table.headers {
            let html = inline_html(cell, post, registry, span)?;
            lines.push(format!("{}            <th>{}</th>", indent, html));
        }
        lines.push(format!("{}        </tr>", indent));
        lines.push(format!("{}    </thead>", indent));
    }
    if !table.rows.is_empty() {
        lines.push(format!("{}    <tbody>", indent));
        for row in &table.rows {
            lines.push(format!("{}        <tr>", indent));
            for cell in row {
                let html = inline_html(cell, post, registry, span)?;
                lines.push(format!("{}            <td>{}</td>", indent, html));
            }
            lines.push(format!("{}        </tr>", indent));
        }
        lines.push(format!("{}    </tbody>", indent));
    }
    lines.push(format!("{}</table>", indent));
    Ok(())
}

fn inline_html(
    text: &str,
    post: &Post,
    registry: &mut SidenoteRegistry,
    span: &Range<usize>,
) -> Result<String, RenderDiagnostic> {
    let mut cx = InlineContext {
        links: &post.links,
        sidenotes: Some(registry),
    };
    inline::render_inline(text, &mut cx, true)
        .map_err(|e| RenderDiagnostic::fatal(e, Some(span.clone()), post.source_id))
}

/// Indent a multi-line HTML fragment by four spaces per level. With
/// `indent_all` off only the first line shifts, which keeps `<pre>`
/// content byte-exact.
fn indent_block(html: &str, indent_level: usize, indent_all: bool) -> Vec<String> {
    let prefix = " ".repeat(indent_level * 4);
    let lines: Vec<&str> = html.lines().collect();
    if lines.is_empty() {
        return Vec::new();
    }
    if indent_all {
        lines
            .iter()
            .map(|line| {
                if line.is_empty() {
                    String::new()
                } else {
                    format!("{}{}", prefix, line)
                }
            })
            .collect()
    } else {
        let mut out = Vec::with_capacity(lines.len());
        if lines[0].is_empty() {
            out.push(prefix);
        } else {
            out.push(format!("{}{}", prefix, lines[0]));
        }
        out.extend(lines[1..].iter().map(|line| line.to_string()));
        out
    }
}
