use std::collections::HashMap;
use std::sync::LazyLock;

use regex::Regex;

use crate::lines::Line;

static FOOTNOTE_DEF_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\[\^(?P<label>[^\]]+)\]:\s*(?P<body>.*)$").expect("footnote definition regex")
});

static LINK_DEF_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"^\[(?P<label>[^\^\]][^\]]*)\]:\s*(?P<url>\S+)(?:\s+"(?P<title>[^"]*)")?\s*$"#)
        .expect("link definition regex")
});

/// A reference-link target declared with `[label]: url "optional title"`.
#[derive(Debug, Clone, PartialEq)]
pub struct LinkDefinition {
    pub url: String,
    pub title: Option<String>,
}

/// The harvested body: definition lines replaced by blanks, plus the two
/// side maps. Both maps use last-write-wins on duplicate labels.
#[derive(Debug)]
pub struct Harvest {
    pub lines: Vec<Line>,
    pub footnotes: HashMap<String, String>,
    pub links: HashMap<String, LinkDefinition>,
}

/// Collect footnote and link-reference definitions from the body lines.
///
/// Two independent passes, footnotes first. Consumed lines become blank
/// lines in the returned sequence so the block scanner sees nothing but
/// separation where a definition used to be.
pub fn harvest(lines: Vec<Line>) -> Harvest {
    let mut lines = lines;
    let footnotes = collect_footnotes(&mut lines);
    let links = collect_links(&mut lines);
    Harvest {
        lines,
        footnotes,
        links,
    }
}

fn collect_footnotes(lines: &mut [Line]) -> HashMap<String, String> {
    let mut footnotes = HashMap::new();
    let mut i = 0;

    while i < lines.len() {
        let Some(caps) = FOOTNOTE_DEF_RE.captures(&lines[i].text) else {
            i += 1;
            continue;
        };
        let label = caps["label"].trim().to_string();
        let mut collected: Vec<String> = Vec::new();
        let body = caps["body"].trim_end();
        if !body.is_empty() {
            collected.push(body.trim().to_string());
        }
        lines[i].blank();
        i += 1;

        // Continuation lines are indented by four spaces or a tab.
        while i < lines.len() {
            let text = &lines[i].text;
            if !text.starts_with("    ") && !text.starts_with('\t') {
                break;
            }
            collected.push(text.trim_start().to_string());
            lines[i].blank();
            i += 1;
        }

        footnotes.insert(label, collected.join("\n").trim().to_string());
    }

    footnotes
}

fn collect_links(lines: &mut [Line]) -> HashMap<String, LinkDefinition> {
    let mut links = HashMap::new();

    for line in lines.iter_mut() {
        let Some(caps) = LINK_DEF_RE.captures(&line.text) else {
            continue;
        };
        let label = caps["label"].trim().to_lowercase();
        let definition = LinkDefinition {
            url: caps["url"].to_string(),
            title: caps.name("title").map(|m| m.as_str().to_string()),
        };
        links.insert(label, definition);
        line.blank();
    }

    links
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lines::split_lines;

    fn harvest_str(body: &str) -> Harvest {
        harvest(split_lines(body))
    }

    #[test]
    fn single_line_footnote() {
        let h = harvest_str("[^x]: Note.\n\nText");
        assert_eq!(h.footnotes.get("x").map(String::as_str), Some("Note."));
        assert!(h.lines[0].is_blank());
        assert_eq!(h.lines[2].text, "Text");
    }

    #[test]
    fn footnote_continuation_lines_join_with_newline() {
        let h = harvest_str("[^x]: First.\n    Second.\n\tThird.\nNot part");
        assert_eq!(
            h.footnotes.get("x").map(String::as_str),
            Some("First.\nSecond.\nThird.")
        );
        assert_eq!(h.lines[3].text, "Not part");
    }

    #[test]
    fn blank_line_ends_footnote_body() {
        let h = harvest_str("[^x]: Only this.\n\n    indented paragraph");
        assert_eq!(h.footnotes.get("x").map(String::as_str), Some("Only this."));
        assert_eq!(h.lines[2].text, "    indented paragraph");
    }

    #[test]
    fn link_definitions_lower_case_their_labels() {
        let h = harvest_str("[MDN]: https://developer.mozilla.org \"MDN Web Docs\"");
        let def = h.links.get("mdn").unwrap();
        assert_eq!(def.url, "https://developer.mozilla.org");
        assert_eq!(def.title.as_deref(), Some("MDN Web Docs"));
    }

    #[test]
    fn link_definition_without_title() {
        let h = harvest_str("[home]: /index.html");
        let def = h.links.get("home").unwrap();
        assert_eq!(def.url, "/index.html");
        assert_eq!(def.title, None);
    }

    #[test]
    fn footnote_labels_are_not_link_labels() {
        let h = harvest_str("[^note]: body");
        assert!(h.links.is_empty());
        assert!(h.footnotes.contains_key("note"));
    }

    #[test]
    fn duplicate_labels_last_write_wins() {
        let h = harvest_str("[a]: /one\n[a]: /two\n[^n]: first\n[^n]: second");
        assert_eq!(h.links.get("a").unwrap().url, "/two");
        assert_eq!(h.footnotes.get("n").map(String::as_str), Some("second"));
    }
}
