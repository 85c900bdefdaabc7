//! Snippet resolution
//!
//! Tab stops and placeholders collapse to their default text, choices to
//! their first option and variables to their default (or nothing). `$0`
//! marks the cursor. Malformed syntax is kept as literal text.

/// Plain text produced from a snippet
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedSnippet {
    pub text: String,
    /// Character offset of `$0` within `text`
    pub cursor: Option<usize>,
}

pub fn resolve_snippet(snippet: &str) -> ResolvedSnippet {
    let chars: Vec<char> = snippet.chars().collect();
    let mut parser = SnippetParser {
        chars: &chars,
        pos: 0,
        out: String::with_capacity(snippet.len()),
        out_chars: 0,
        cursor: None,
    };
    parser.parse_text(false);

    ResolvedSnippet {
        text: parser.out,
        cursor: parser.cursor,
    }
}

struct SnippetParser<'a> {
    chars: &'a [char],
    pos: usize,
    out: String,
    out_chars: usize,
    cursor: Option<usize>,
}

impl SnippetParser<'_> {
    fn peek(&self) -> Option<char> {
        self.chars.get(self.pos).copied()
    }

    fn push(&mut self, c: char) {
        self.out.push(c);
        self.out_chars += 1;
    }

    fn mark_cursor(&mut self) {
        if self.cursor.is_none() {
            self.cursor = Some(self.out_chars);
        }
    }

    /// Emits text until the input ends or, when `nested`, an unescaped `}`.
    /// Returns whether the closing brace was consumed.
    fn parse_text(&mut self, nested: bool) -> bool {
        while let Some(c) = self.peek() {
            match c {
                '\\' => {
                    self.pos += 1;
                    match self.peek() {
                        Some(escaped @ ('$' | '}' | '\\')) => {
                            self.push(escaped);
                            self.pos += 1;
                        }
                        _ => self.push('\\'),
                    }
                }
                '}' if nested => {
                    self.pos += 1;
                    return true;
                }
                '$' => {
                    if !self.parse_dollar() {
                        self.push('$');
                        self.pos += 1;
                    }
                }
                _ => {
                    self.push(c);
                    self.pos += 1;
                }
            }
        }
        false
    }

    fn read_number(&mut self) -> Option<u32> {
        let start = self.pos;
        while self.peek().is_some_and(|c| c.is_ascii_digit()) {
            self.pos += 1;
        }
        if start == self.pos {
            return None;
        }
        self.chars[start..self.pos]
            .iter()
            .collect::<String>()
            .parse()
            .ok()
    }

    fn read_name(&mut self) -> bool {
        if !self.peek().is_some_and(|c| c == '_' || c.is_ascii_alphabetic()) {
            return false;
        }
        while self
            .peek()
            .is_some_and(|c| c == '_' || c.is_ascii_alphanumeric())
        {
            self.pos += 1;
        }
        true
    }

    /// Parses the construct starting at `$`. On malformed input nothing is
    /// emitted, the position is restored and `false` is returned.
    fn parse_dollar(&mut self) -> bool {
        let start = self.pos;
        self.pos += 1;

        if let Some(index) = self.read_number() {
            if index == 0 {
                self.mark_cursor();
            }
            return true;
        }
        if self.read_name() {
            return true;
        }
        if self.peek() != Some('{') {
            self.pos = start;
            return false;
        }
        self.pos += 1;

        let parsed = if let Some(index) = self.read_number() {
            self.parse_placeholder_body(index)
        } else if self.read_name() {
            self.parse_variable_body()
        } else {
            false
        };

        if !parsed {
            self.pos = start;
        }
        parsed
    }

    fn parse_placeholder_body(&mut self, index: u32) -> bool {
        match self.peek() {
            Some('}') => {
                self.pos += 1;
                if index == 0 {
                    self.mark_cursor();
                }
                true
            }
            Some(':') => {
                self.pos += 1;
                self.parse_default(index == 0)
            }
            Some('|') => {
                self.pos += 1;
                match self.parse_choice() {
                    Some(first) => {
                        if index == 0 {
                            self.mark_cursor();
                        }
                        first.chars().for_each(|c| self.push(c));
                        true
                    }
                    None => false,
                }
            }
            _ => false,
        }
    }

    /// Emits a default up to its closing `}`. Without one, everything the
    /// default emitted is taken back and `false` is returned.
    fn parse_default(&mut self, final_stop: bool) -> bool {
        let (len, chars, cursor) = (self.out.len(), self.out_chars, self.cursor);
        if final_stop {
            self.mark_cursor();
        }
        if self.parse_text(true) {
            return true;
        }
        self.out.truncate(len);
        self.out_chars = chars;
        self.cursor = cursor;
        false
    }

    /// Reads `a,b|}` and returns the first option
    fn parse_choice(&mut self) -> Option<String> {
        let mut first = String::new();
        let mut in_first = true;
        while let Some(c) = self.peek() {
            self.pos += 1;
            match c {
                '\\' => {
                    if let Some(escaped) = self.peek() {
                        self.pos += 1;
                        if in_first {
                            first.push(escaped);
                        }
                    }
                }
                ',' => in_first = false,
                '|' if self.peek() == Some('}') => {
                    self.pos += 1;
                    return Some(first);
                }
                _ if in_first => first.push(c),
                _ => {}
            }
        }
        None
    }

    fn parse_variable_body(&mut self) -> bool {
        match self.peek() {
            Some('}') => {
                self.pos += 1;
                true
            }
            Some(':') => {
                self.pos += 1;
                self.parse_default(false)
            }
            // transforms apply to the variable value, which is never known here
            Some('/') => {
                let mut depth = 1;
                while let Some(c) = self.peek() {
                    self.pos += 1;
                    match c {
                        '\\' => self.pos += 1,
                        '{' => depth += 1,
                        '}' => {
                            depth -= 1;
                            if depth == 0 {
                                return true;
                            }
                        }
                        _ => {}
                    }
                }
                false
            }
            _ => false,
        }
    }
}
