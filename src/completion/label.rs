//! Styled display labels

/// Styling applied to `len` characters starting at character `start`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StyleRange {
    pub start: usize,
    pub len: usize,
    pub bold: bool,
    pub strikeout: bool,
}

impl StyleRange {
    fn end(&self) -> usize {
        self.start + self.len
    }
}

/// Label text plus non-overlapping style ranges ordered by start
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StyledLabel {
    pub text: String,
    pub ranges: Vec<StyleRange>,
}

impl StyledLabel {
    pub fn plain(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            ranges: Vec::new(),
        }
    }

    /// Label with the whole text struck out when `deprecated`
    pub fn new(text: impl Into<String>, deprecated: bool) -> Self {
        let text = text.into();
        let len = text.chars().count();
        let ranges = if deprecated && len > 0 {
            vec![StyleRange {
                start: 0,
                len,
                bold: false,
                strikeout: true,
            }]
        } else {
            Vec::new()
        };
        Self { text, ranges }
    }

    /// Makes `start..start + len` bold.
    ///
    /// Existing ranges are split around the bold span so every resulting
    /// piece keeps its strikeout.
    pub fn with_bold(mut self, start: usize, len: usize) -> Self {
        let total = self.text.chars().count();
        let end = (start + len).min(total);
        if start >= end {
            return self;
        }

        let struck = |from: usize, to: usize| {
            self.ranges
                .iter()
                .any(|range| range.strikeout && range.start < to && from < range.end())
        };
        let bold_strikeout = struck(start, end);

        let mut ranges = Vec::with_capacity(self.ranges.len() + 2);
        for range in &self.ranges {
            if range.end() <= start || range.start >= end {
                ranges.push(*range);
                continue;
            }
            if range.start < start {
                ranges.push(StyleRange {
                    len: start - range.start,
                    ..*range
                });
            }
            if range.end() > end {
                ranges.push(StyleRange {
                    start: end,
                    len: range.end() - end,
                    ..*range
                });
            }
        }
        ranges.push(StyleRange {
            start,
            len: end - start,
            bold: true,
            strikeout: bold_strikeout,
        });
        ranges.sort_by_key(|range| range.start);

        self.ranges = ranges;
        self
    }
}
