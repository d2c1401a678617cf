use std::ops::Range;

/// A single source line paired with its byte span in the original text.
/// Spans survive harvesting so every later stage can point diagnostics
/// back into the file the author actually wrote.
#[derive(Debug, Clone)]
pub struct Line {
    pub text: String,
    pub span: Range<usize>,
}

impl Line {
    /// Replace the text with an empty line, keeping the span.
    pub fn blank(&mut self) {
        self.text.clear();
    }

    pub fn is_blank(&self) -> bool {
        self.text.trim().is_empty()
    }
}

/// Split source text into spanned lines. The trailing `\r` of CRLF line
/// endings is dropped from the text; spans never include line terminators.
pub fn split_lines(source: &str) -> Vec<Line> {
    let mut lines = Vec::new();
    let mut start = 0usize;

    for segment in source.split('\n') {
        let text = segment.strip_suffix('\r').unwrap_or(segment);
        lines.push(Line {
            text: text.to_string(),
            span: start..start + text.len(),
        });
        start += segment.len() + 1;
    }

    lines
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn spans_index_into_source() {
        let source = "abc\ndef\r\n\nxy";
        let lines = split_lines(source);
        assert_eq!(lines.len(), 4);
        assert_eq!(&source[lines[0].span.clone()], "abc");
        assert_eq!(&source[lines[1].span.clone()], "def");
        assert_eq!(&source[lines[2].span.clone()], "");
        assert_eq!(&source[lines[3].span.clone()], "xy");
    }
}
