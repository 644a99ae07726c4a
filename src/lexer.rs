/// A single tokenized source line.
///
/// PAL is line-oriented: the lexer never looks across line boundaries. Each
/// line is reduced to its indentation depth and its colon-delimited fields;
/// everything from the first unescaped `//` onwards is discarded as a comment.
#[derive(Debug, PartialEq, Clone)]
pub struct Line {
    /// Leading whitespace run length, measured in raw characters (spaces and
    /// tabs each count as one; indentation is never normalized).
    pub indent: usize,
    /// The fields of the line, split on `:` and trimmed. A blank line (or a
    /// comment-only line) reduces to a single empty field.
    pub fields: Vec<String>,
    /// 0-based source line number.
    pub number: usize,
    pub pos_start: usize,
    pub pos_end: usize,
}

impl Line {
    /// True when the line carries no content after comment stripping.
    #[must_use]
    pub fn is_blank(&self) -> bool {
        self.fields.len() == 1 && self.fields[0].is_empty()
    }
}

pub struct Lexer<'a> {
    input: &'a str,
}

impl<'a> Lexer<'a> {
    pub fn new(input: &'a str) -> Self {
        Self { input }
    }

    pub fn lex(&mut self) -> Vec<Line> {
        let mut lines = Vec::new();
        let mut offset = 0;
        for (number, raw) in self.input.split('\n').enumerate() {
            let line = raw.strip_suffix('\r').unwrap_or(raw);
            let content = strip_comment(line);
            let indent = content
                .chars()
                .take_while(|c| *c == ' ' || *c == '\t')
                .count();
            let fields = content.split(':').map(|f| f.trim().to_string()).collect();
            lines.push(Line {
                indent,
                fields,
                number,
                pos_start: offset,
                pos_end: offset + line.len(),
            });
            offset += raw.len() + 1;
        }
        lines
    }
}

/// Truncates `line` at the first `//` that is not shielded by a backslash.
/// The backslash itself stays in the field text.
fn strip_comment(line: &str) -> &str {
    let bytes = line.as_bytes();
    let mut i = 0;
    while i + 1 < bytes.len() {
        if bytes[i] == b'/' && bytes[i + 1] == b'/' && (i == 0 || bytes[i - 1] != b'\\') {
            return &line[..i];
        }
        i += 1;
    }
    line
}
