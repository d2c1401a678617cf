use std::collections::HashMap;

use folio::harvest::LinkDefinition;

use crate::error::RenderError;
use crate::inline::{self, InlineContext};

/// A memoized sidenote: assigned id, 1-based display number, rendered body.
#[derive(Debug, Clone)]
pub struct SidenoteEntry {
    pub id: String,
    pub number: usize,
    pub html: String,
}

/// Per-document registry mapping footnote labels to numbered entries.
///
/// Entries are created lazily on first reference and memoized: a second
/// reference to the same label reuses the existing id, number, and body
/// without re-rendering. Construct one registry per document; numbering is
/// first-reference order.
#[derive(Debug, Default)]
pub struct SidenoteRegistry {
    definitions: HashMap<String, String>,
    order: Vec<String>,
    entries: HashMap<String, SidenoteEntry>,
}

impl SidenoteRegistry {
    pub fn new(definitions: &HashMap<String, String>) -> Self {
        let definitions = definitions
            .iter()
            .filter(|(key, _)| !key.trim().is_empty())
            .map(|(key, value)| (key.trim().to_string(), value.clone()))
            .collect();
        SidenoteRegistry {
            definitions,
            order: Vec::new(),
            entries: HashMap::new(),
        }
    }

    pub fn has_notes(&self) -> bool {
        !self.entries.is_empty()
    }

    /// Render the inline marker for `label`, creating the entry on first
    /// reference. The definition body renders through the inline renderer
    /// with sidenote recursion disabled: a sidenote cannot reference
    /// another sidenote.
    pub fn render_reference(
        &mut self,
        label: &str,
        links: &HashMap<String, LinkDefinition>,
    ) -> Result<String, RenderError> {
        let key = label.trim();
        if key.is_empty() {
            return Err(RenderError::EmptySidenoteLabel);
        }
        let Some(definition) = self.definitions.get(key) else {
            return Err(RenderError::UnknownSidenote(key.to_string()));
        };

        if !self.entries.contains_key(key) {
            let number = self.entries.len() + 1;
            let content = inline::collapse_text(definition);
            let mut cx = InlineContext {
                links,
                sidenotes: None,
            };
            let html = inline::render_inline(&content, &mut cx, true)?;
            self.entries.insert(
                key.to_string(),
                SidenoteEntry {
                    id: format!("sn{}", number - 1),
                    number,
                    html,
                },
            );
            self.order.push(key.to_string());
        }

        let entry = &self.entries[key];
        Ok(format!(
            "<label for=\"{id}\" class=\"sidenote-number\" data-number=\"{n}\"></label>\
             <input type=\"checkbox\" id=\"{id}\" class=\"margin-toggle\">\
             <span class=\"sidenote sidenote--inline\"><span class=\"sidenote__marker\" data-number=\"{n}\"></span>{html}</span>",
            id = entry.id,
            n = entry.number,
            html = entry.html,
        ))
    }

    /// One rail-positioned span per memoized entry, in assignment order,
    /// each tagged with its id so the two representations associate.
    pub fn render_rail_spans(&self) -> String {
        let mut parts = Vec::new();
        for key in &self.order {
            let entry = &self.entries[key];
            parts.push(format!(
                "<span class=\"sidenote sidenote--rail\" data-sidenote-ref=\"{}\"><span class=\"sidenote__marker\" data-number=\"{}\"></span>{}</span>",
                entry.id, entry.number, entry.html,
            ));
        }
        parts.join("\n")
    }
}
