use folio::parser::Parser;
use renderer::{
    CollaboratorError, Highlighter, MathBatch, MathRenderer, PlainHighlighter, RenderDiagnostic,
};

/// Deterministic math stub: placeholder SVG per expression plus a glyph
/// cache fragment.
struct StubMath;

impl MathRenderer for StubMath {
    fn render_batch(&mut self, expressions: &[String]) -> Result<MathBatch, CollaboratorError> {
        let fragments = expressions
            .iter()
            .map(|tex| format!("<svg data-tex=\"{}\"></svg>", tex.replace('"', "&quot;")))
            .collect();
        Ok(MathBatch {
            cache: "<svg class=\"glyph-cache\"></svg>".to_string(),
            fragments,
        })
    }
}

struct FailingMath;

impl MathRenderer for FailingMath {
    fn render_batch(&mut self, _expressions: &[String]) -> Result<MathBatch, CollaboratorError> {
        Err(CollaboratorError("tex2svg unavailable".to_string()))
    }
}

struct FailingHighlighter;

impl Highlighter for FailingHighlighter {
    fn highlight(&self, _code: &str, _language: &str) -> Result<String, CollaboratorError> {
        Err(CollaboratorError("highlighter crashed".to_string()))
    }
}

fn render_full(source: &str) -> Result<(String, Vec<RenderDiagnostic>), RenderDiagnostic> {
    let post = Parser::new(source.to_string(), 0)
        .parse()
        .expect("parse failed");
    renderer::render_post(&post, &PlainHighlighter, &mut StubMath)
}

fn render(source: &str) -> String {
    render_full(source).expect("render failed").0
}

fn render_err(source: &str) -> String {
    render_full(source)
        .expect_err("expected render failure")
        .to_string()
}

/// Wrap a body in minimal front matter.
fn doc(body: &str) -> String {
    format!("---\ntitle: Test\n---\n\n{}", body)
}

#[test]
fn metadata_title_overrides_extracted_heading() {
    let html = render("---\ntitle: Meta Title\n---\n\n# Body Title\n\nText");
    assert!(html.contains("data-page-title=\"Meta Title\""));
}

#[test]
fn extracted_heading_is_the_fallback_title() {
    let html = render("---\ndate: 2024-05-01\n---\n\n# Hello\n\nText");
    assert!(html.contains("data-page-title=\"Hello\""));
}

#[test]
fn missing_title_is_fatal() {
    assert!(render_err("---\ndate: 2024-05-01\n---\n\nJust text").contains("missing title"));
}

#[test]
fn dash_runs_rewrite_by_exact_length() {
    let html = render("---\ndate: x\n---\n\n# Hello\n\nA--B---C");
    assert!(html.contains("data-page-title=\"Hello\""));
    assert!(html.contains("A&ndash;B<span class=\"emdash-box\">&mdash;</span>C"));
}

#[test]
fn dash_rewriting_ignores_other_run_lengths() {
    let html = render(&doc("a-b ----c"));
    assert!(html.contains("<p>a-b ----c</p>"));
}

#[test]
fn unicode_dashes_rewrite_like_hyphen_runs() {
    let html = render(&doc("x\u{2014}y\u{2013}z"));
    assert!(html.contains("x<span class=\"emdash-box\">&mdash;</span>y&ndash;z"));
}

#[test]
fn emphasis_family_renders() {
    let html = render(&doc("**b** *i* ~~s~~ ==h=="));
    assert!(html.contains("<strong>b</strong>"));
    assert!(html.contains("<em>i</em>"));
    assert!(html.contains("<del>s</del>"));
    assert!(html.contains("<mark>h</mark>"));
}

#[test]
fn emphasis_nests_recursively() {
    let html = render(&doc("**bold *and italic***"));
    assert!(html.contains("<strong>bold <em>and italic</em></strong>"));
}

#[test]
fn code_spans_escape_and_stay_verbatim() {
    let html = render(&doc("use `a < b` here"));
    assert!(html.contains("<code>a &lt; b</code>"));
    // No dash rewriting inside code spans.
    let html = render(&doc("`--x`"));
    assert!(html.contains("<code>--x</code>"));
}

#[test]
fn backslash_escapes_suppress_markup() {
    let html = render(&doc("\\*not emphasis\\*"));
    assert!(html.contains("<p>*not emphasis*</p>"));
}

#[test]
fn inline_links_render_with_escaped_urls() {
    let html = render(&doc("See [the docs](https://example.com?a=1&b=2)."));
    assert!(
        html.contains("<a class=\"highlight\" href=\"https://example.com?a=1&amp;b=2\">the docs</a>")
    );
}

#[test]
fn link_text_renders_without_nested_links() {
    let html = render(&doc("[**bold** label](https://example.com)"));
    assert!(html.contains("><strong>bold</strong> label</a>"));
}

#[test]
fn reference_links_resolve_case_insensitively() {
    let html = render(&doc("Read [The Guide][MDN].\n\n[mdn]: https://example.com \"Docs\""));
    assert!(html.contains(
        "<a class=\"highlight\" href=\"https://example.com\" title=\"Docs\">The Guide</a>"
    ));
}

#[test]
fn empty_reference_label_defaults_to_the_text() {
    let html = render(&doc("Read [guide][].\n\n[guide]: /guide.html"));
    assert!(html.contains("href=\"/guide.html\">guide</a>"));
}

#[test]
fn unresolved_reference_labels_stay_plain_text() {
    let html = render(&doc("Read [something][nope]."));
    assert!(html.contains("[something][nope]"));
    assert!(!html.contains("<a class=\"highlight\" href"));
}

#[test]
fn autolinks_accept_known_schemes_only() {
    let html = render(&doc("Go to <https://example.com> now"));
    assert!(html.contains(
        "<a class=\"highlight\" href=\"https://example.com\">https://example.com</a>"
    ));

    let html = render(&doc("a <b> c"));
    assert!(html.contains("a &lt;b&gt; c"));
}

#[test]
fn sidenote_references_share_one_numbered_entry() {
    let html = render(&doc("First[^x] and again[^x].\n\n[^x]: Note body."));
    // Both inline markers use the same id and number.
    assert_eq!(html.matches("<label for=\"sn0\"").count(), 2);
    // Two inline markers carry two numbered elements each; the rail
    // entry carries one more.
    assert_eq!(html.matches("data-number=\"1\"").count(), 5);
    assert!(!html.contains("sn1"));
    // Exactly one rail entry.
    assert_eq!(html.matches("sidenote--rail").count(), 1);
    assert!(html.contains("data-sidenote-ref=\"sn0\""));
}

#[test]
fn sidenote_numbering_follows_first_reference_order() {
    let html = render(&doc(
        "B first[^b], then a[^a].\n\n[^a]: Note a.\n[^b]: Note b.",
    ));
    let b_pos = html.find("Note b.").unwrap();
    let a_pos = html.find("Note a.").unwrap();
    assert!(b_pos < a_pos, "rail order must follow first reference");
    assert!(html.contains("<label for=\"sn0\""));
    assert!(html.contains("<label for=\"sn1\""));
}

#[test]
fn undefined_sidenote_label_is_fatal() {
    assert!(render_err(&doc("Missing[^ghost].")).contains("no matching definition"));
}

#[test]
fn sidenotes_cannot_reference_sidenotes() {
    let err = render_err(&doc("Top[^a].\n\n[^a]: Refers to [^b].\n[^b]: Inner."));
    assert!(err.contains("not available here"));
}

#[test]
fn table_cells_render_padded_to_header_width() {
    let html = render(&doc("A|B\n---|---\n1|"));
    assert!(html.contains("<th>A</th>"));
    assert!(html.contains("<td>1</td>"));
    assert!(html.contains("<td></td>"));
}

#[test]
fn table_caption_renders_first() {
    let html = render(&doc("Table: Totals\nA|B\n---|---\n1|2"));
    let caption = html.find("<caption>Totals</caption>").unwrap();
    let head = html.find("<thead>").unwrap();
    assert!(caption < head);
}

#[test]
fn nested_lists_render_inside_their_item() {
    let html = render(&doc("- a\n  - b\n- c"));
    let expected = [
        "            <ul>",
        "                <li>a",
        "                    <ul>",
        "                        <li>b</li>",
        "                    </ul>",
        "                </li>",
        "                <li>c</li>",
        "            </ul>",
    ]
    .join("\n");
    assert!(html.contains(&expected), "got:\n{}", html);
}

#[test]
fn task_items_carry_completion_styling() {
    let html = render(&doc("- [x] shipped\n- [ ] pending"));
    assert!(html.contains(
        "<li class=\"task-item task-item--done\"><input type=\"checkbox\" checked disabled> shipped</li>"
    ));
    assert!(html.contains(
        "<li class=\"task-item\"><input type=\"checkbox\" disabled> pending</li>"
    ));
}

#[test]
fn blockquote_paragraphs_collapse_to_single_lines() {
    let html = render(&doc("> line one\n> line two\n>\n> second"));
    assert!(html.contains("<p>line one line two</p>"));
    assert!(html.contains("<p>second</p>"));
}

#[test]
fn code_blocks_wrap_in_the_site_structure() {
    let html = render(&doc("```rust\nlet x = 1;\n```"));
    assert!(html.contains("<span class=\"code-language-tag\">rust</span>"));
    assert!(html.contains("<pre><code class=\"language-rust hljs\">let x = 1;</code></pre>"));
}

#[test]
fn highlighter_failure_degrades_with_a_warning() {
    let post = Parser::new(doc("```rust\nlet x = 1 < 2;\n```"), 0)
        .parse()
        .expect("parse failed");
    let (html, warnings) = renderer::render_post(&post, &FailingHighlighter, &mut StubMath)
        .expect("render must not fail");
    assert!(html.contains("let x = 1 &lt; 2;"));
    assert_eq!(warnings.len(), 1);
    assert!(warnings[0].is_warning);
    assert!(warnings[0].to_string().contains("highlighter crashed"));
    assert!(warnings[0].span.is_some());
}

#[test]
fn math_cache_precedes_only_the_first_math_block() {
    let html = render(&doc("\\[\na^2\n\\]\n\ntext\n\n\\[\nb^2\n\\]"));
    assert_eq!(html.matches("glyph-cache").count(), 1);
    let cache = html.find("glyph-cache").unwrap();
    let first = html.find("data-tex=\"a^2\"").unwrap();
    let second = html.find("data-tex=\"b^2\"").unwrap();
    assert!(cache < first && first < second);
    assert_eq!(html.matches("math-display").count(), 2);
}

#[test]
fn math_renderer_failure_is_fatal() {
    let post = Parser::new(doc("\\[\na^2\n\\]"), 0).parse().expect("parse failed");
    let err = renderer::render_post(&post, &PlainHighlighter, &mut FailingMath)
        .expect_err("math failure must abort");
    assert!(err.to_string().contains("tex2svg unavailable"));
    assert!(!err.is_warning);
}

#[test]
fn documents_without_math_never_invoke_the_renderer() {
    let post = Parser::new(doc("Just text"), 0).parse().expect("parse failed");
    renderer::render_post(&post, &PlainHighlighter, &mut FailingMath)
        .expect("no math blocks, no math call");
}

#[test]
fn raw_html_bypasses_escaping() {
    let html = render(&doc("<div data-x=\"1 & 2\">\n</div>"));
    assert!(html.contains("<div data-x=\"1 & 2\">"));
}

#[test]
fn image_with_caption_becomes_a_figure() {
    let html = render(&doc("![A chart](chart.png \"Quarterly totals\")"));
    assert!(html.contains("<figure>"));
    assert!(html.contains("<img src=\"chart.png\" alt=\"A chart\">"));
    assert!(html.contains("<figcaption>Quarterly totals</figcaption>"));
}

#[test]
fn image_without_caption_stays_bare() {
    let html = render(&doc("![A chart](chart.png)"));
    assert!(html.contains("<img src=\"chart.png\" alt=\"A chart\">"));
    assert!(!html.contains("<figure>"));
}

#[test]
fn horizontal_rule_renders() {
    assert!(render(&doc("***")).contains("<hr>"));
}

#[test]
fn empty_rail_renders_an_empty_container() {
    let html = render(&doc("No notes here"));
    assert!(html.contains("<div class=\"writing-post__rail-right\"></div>"));
}

#[test]
fn hand_authored_rail_precedes_the_sidenote_rail() {
    let html = render(&doc(
        ":::rail-right\n<p>aside</p>\n:::\n\nText[^n].\n\n[^n]: Note.",
    ));
    let aside = html.find("<p>aside</p>").unwrap();
    let rail_note = html.find("sidenote--rail").unwrap();
    assert!(aside < rail_note);
}

#[test]
fn numbered_subtitles_sort_numerically() {
    let html = render("---\ntitle: T\nsubtitle_2: Second\nSubtitle_1: First\n---\n\nText");
    assert!(html.contains("data-page-subtitle-0=\"First\""));
    assert!(html.contains("data-page-subtitle-1=\"Second\""));
}

#[test]
fn subtitle_fallback_order_is_long_short_plain() {
    let html = render("---\ntitle: T\nsubtitle: Plain\nsubtitle_long: Long\n---\n\nText");
    assert!(html.contains("data-page-subtitle-0=\"Long\""));
    assert!(html.contains("data-page-subtitle-1=\"Plain\""));
}

#[test]
fn date_then_title_back_subtitles() {
    let html = render("---\ntitle: T\ndate: 2024-05-01\n---\n\nText");
    assert!(html.contains("data-page-subtitle-0=\"2024-05-01\""));

    let html = render("---\ntitle: T\n---\n\nText");
    assert!(html.contains("data-page-subtitle-0=\"T\""));
}

#[test]
fn article_shell_has_rail_content_rail_right() {
    let html = render(&doc("Text"));
    assert!(html.starts_with("<article class=\"writing-post\""));
    assert!(html.contains("<nav class=\"writing-toc\" data-toc></nav>"));
    assert!(html.contains("<div class=\"writing-post__content\" data-toc-intro>"));
    assert!(html.ends_with("</article>\n"));
}

#[test]
fn heading_text_renders_inline_markup() {
    let html = render(&doc("## A `code` heading"));
    assert!(html.contains("<h2>A <code>code</code> heading</h2>"));
}
