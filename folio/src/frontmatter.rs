use crate::lines::{self, Line};
use crate::parser::ParseError;

/// Front-matter metadata: `(key, value)` pairs in source order.
///
/// Keys are case-sensitive; a duplicate key overwrites the earlier value in
/// place, keeping its original position.
#[derive(Debug, Clone, Default)]
pub struct Metadata {
    pairs: Vec<(String, String)>,
}

impl Metadata {
    pub fn get(&self, key: &str) -> Option<&str> {
        self.pairs
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    pub fn insert(&mut self, key: String, value: String) {
        if let Some(pair) = self.pairs.iter_mut().find(|(k, _)| *k == key) {
            pair.1 = value;
        } else {
            self.pairs.push((key, value));
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.pairs.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

/// Split a document into front-matter metadata and its body lines.
///
/// The first line must be a bare `---`; a later bare `---` closes the
/// section. Every non-blank line in between must contain a colon (only the
/// first colon splits). Leading blank lines of the body are dropped; the
/// returned lines keep their byte spans into the original source.
pub fn extract(source: &str, file_id: usize) -> Result<(Metadata, Vec<Line>), ParseError> {
    let mut all = lines::split_lines(source);

    match all.first() {
        Some(first) if first.text.trim() == "---" => {}
        Some(first) => {
            return Err(ParseError::new(
                "markdown file must start with a '---' front matter delimiter",
                first.span.clone(),
                file_id,
            ));
        }
        None => {
            return Err(ParseError::new(
                "markdown file must start with a '---' front matter delimiter",
                0..0,
                file_id,
            ));
        }
    }

    let open_span = all[0].span.clone();
    let mut close_index = None;
    for (idx, line) in all.iter().enumerate().skip(1) {
        if line.text.trim() == "---" {
            close_index = Some(idx);
            break;
        }
    }
    let Some(close_index) = close_index else {
        return Err(ParseError::new(
            "front matter is not closed with '---'",
            open_span,
            file_id,
        ));
    };

    let mut metadata = Metadata::default();
    for line in &all[1..close_index] {
        if line.is_blank() {
            continue;
        }
        let Some((key, value)) = line.text.split_once(':') else {
            return Err(ParseError::new(
                format!("invalid front matter line: {}", line.text),
                line.span.clone(),
                file_id,
            )
            .with_note("front matter lines take the form 'key: value'"));
        };
        metadata.insert(key.trim().to_string(), value.trim().to_string());
    }

    let mut body: Vec<Line> = all.split_off(close_index + 1);
    let lead = body.iter().take_while(|l| l.is_blank()).count();
    body.drain(..lead);

    Ok((metadata, body))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn splits_metadata_and_body() {
        let source = "---\ntitle: Hello\ndate: 2024-01-01\n---\n\nBody text\n";
        let (meta, body) = extract(source, 0).unwrap();
        assert_eq!(meta.get("title"), Some("Hello"));
        assert_eq!(meta.get("date"), Some("2024-01-01"));
        assert_eq!(body[0].text, "Body text");
    }

    #[test]
    fn only_first_colon_splits() {
        let source = "---\nlink: https://example.com\n---\n";
        let (meta, _) = extract(source, 0).unwrap();
        assert_eq!(meta.get("link"), Some("https://example.com"));
    }

    #[test]
    fn missing_opening_delimiter_fails() {
        assert!(extract("title: x\n---\n", 0).is_err());
    }

    #[test]
    fn unclosed_front_matter_fails() {
        let err = extract("---\ntitle: x\n", 0).unwrap_err();
        assert!(err.message.contains("not closed"));
    }

    #[test]
    fn colonless_line_fails_with_its_span() {
        let source = "---\ntitle: x\nbroken line\n---\n";
        let err = extract(source, 0).unwrap_err();
        assert_eq!(&source[err.span.clone()], "broken line");
    }

    #[test]
    fn duplicate_keys_overwrite_in_place() {
        let source = "---\na: 1\nb: 2\na: 3\n---\n";
        let (meta, _) = extract(source, 0).unwrap();
        assert_eq!(meta.get("a"), Some("3"));
        let keys: Vec<&str> = meta.iter().map(|(k, _)| k).collect();
        assert_eq!(keys, vec!["a", "b"]);
    }
}
