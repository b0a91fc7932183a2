//! Text model primitives: sizes, ranges, and line/column conversions.

use std::str::FromStr;

pub use text_size::{TextRange, TextSize};

/// Zero-based line and byte column.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub struct LineCol {
    pub line: u32,
    pub col: u32,
}

impl LineCol {
    #[inline]
    pub const fn new(line: u32, col: u32) -> Self {
        Self { line, col }
    }
}

/// Parses the one-based `LINE:COL` notation used on command lines and in
/// diagnostics output.
impl FromStr for LineCol {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (line, col) = s
            .split_once(':')
            .ok_or_else(|| format!("expected `LINE:COL`, got `{s}`"))?;
        let line: u32 = line
            .trim()
            .parse()
            .map_err(|_| format!("invalid line number `{line}`"))?;
        let col: u32 = col
            .trim()
            .parse()
            .map_err(|_| format!("invalid column number `{col}`"))?;
        if line == 0 || col == 0 {
            return Err("line and column are one-based".to_string());
        }
        Ok(LineCol {
            line: line - 1,
            col: col - 1,
        })
    }
}

/// Line table for one snapshot of a source file.
///
/// Each entry is the content range of a line, terminator excluded. `\n`,
/// `\r\n` and a lone `\r` all end a line, so a trailing terminator leaves an
/// empty last line.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct LineIndex {
    lines: Vec<TextRange>,
    len: TextSize,
}

fn size(n: usize) -> TextSize {
    TextSize::from(n as u32)
}

impl LineIndex {
    pub fn new(text: &str) -> Self {
        let bytes = text.as_bytes();
        let mut lines = Vec::new();
        let mut start = 0;

        while let Some(found) = bytes[start..]
            .iter()
            .position(|&b| matches!(b, b'\n' | b'\r'))
        {
            let end = start + found;
            lines.push(TextRange::new(size(start), size(end)));
            start = match &bytes[end..] {
                [b'\r', b'\n', ..] => end + 2,
                _ => end + 1,
            };
        }
        lines.push(TextRange::new(size(start), size(bytes.len())));

        Self {
            lines,
            len: size(bytes.len()),
        }
    }

    #[inline]
    pub fn text_len(&self) -> TextSize {
        self.len
    }

    #[inline]
    pub fn line_count(&self) -> u32 {
        self.lines.len() as u32
    }

    #[inline]
    pub fn line_start(&self, line: u32) -> Option<TextSize> {
        self.line_range(line).map(|range| range.start())
    }

    #[inline]
    pub fn line_end(&self, line: u32) -> Option<TextSize> {
        self.line_range(line).map(|range| range.end())
    }

    /// Byte range of the given line, excluding its terminator.
    pub fn line_range(&self, line: u32) -> Option<TextRange> {
        self.lines.get(line as usize).copied()
    }

    /// Convert a byte offset to a zero-based line/byte-column pair.
    ///
    /// Offsets past the end clamp to the end of the text; an offset inside a
    /// line terminator clamps to the end of its line.
    pub fn line_col(&self, offset: TextSize) -> LineCol {
        let offset = offset.min(self.len);
        // The first line starts at 0, so the partition point is at least 1.
        let line = self
            .lines
            .partition_point(|range| range.start() <= offset)
            .saturating_sub(1);
        let range = self.lines[line];
        LineCol {
            line: line as u32,
            col: u32::from(offset.min(range.end()) - range.start()),
        }
    }

    /// Convert a zero-based line/byte-column pair to a byte offset.
    ///
    /// Returns `None` when the line does not exist or the column runs past the
    /// end of the line.
    pub fn offset(&self, line_col: LineCol) -> Option<TextSize> {
        let range = self.line_range(line_col.line)?;
        let offset = range.start() + TextSize::from(line_col.col);
        (offset <= range.end()).then_some(offset)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn crlf_and_lone_cr_are_line_breaks() {
        let text = "ab\r\ncd\ref";
        let index = LineIndex::new(text);
        assert_eq!(index.line_count(), 3);
        assert_eq!(index.line_col(TextSize::from(4)), LineCol::new(1, 0));
        assert_eq!(index.line_col(TextSize::from(8)), LineCol::new(2, 1));
        assert_eq!(
            index.line_range(0),
            Some(TextRange::new(TextSize::from(0), TextSize::from(2)))
        );
    }

    #[test]
    fn trailing_newline_leaves_an_empty_last_line() {
        let index = LineIndex::new("a\n");
        assert_eq!(index.line_count(), 2);
        assert_eq!(index.line_col(TextSize::from(2)), LineCol::new(1, 0));
        assert_eq!(index.line_col(TextSize::from(99)), LineCol::new(1, 0));
        assert_eq!(LineIndex::new("").line_count(), 1);
    }

    #[test]
    fn offset_rejects_columns_past_line_end() {
        let index = LineIndex::new("class X {}\n}");
        assert_eq!(index.offset(LineCol::new(0, 10)), Some(TextSize::from(10)));
        assert_eq!(index.offset(LineCol::new(0, 11)), None);
        assert_eq!(index.offset(LineCol::new(5, 0)), None);
    }

    #[test]
    fn line_col_parses_one_based_notation() {
        assert_eq!("3:7".parse::<LineCol>(), Ok(LineCol::new(2, 6)));
        assert!("0:1".parse::<LineCol>().is_err());
        assert!("12".parse::<LineCol>().is_err());
        assert!("a:b".parse::<LineCol>().is_err());
    }
}
