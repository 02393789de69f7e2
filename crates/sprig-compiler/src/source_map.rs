//! Origin tracking for combined compilation units.
//!
//! The resolver concatenates many files into one unit. Each file becomes a
//! segment so any byte offset in the unit maps back to the file it came from.

use rowan::TextRange;

use crate::diagnostics::Location;

/// A borrowed view of one segment: display path, content, and where the
/// content starts inside the unit.
#[derive(Clone, Copy, Debug)]
pub struct Segment<'m> {
    pub path: &'m str,
    pub content: &'m str,
    pub start: usize,
}

impl Segment<'_> {
    pub fn end(&self) -> usize {
        self.start + self.content.len()
    }

    /// Translate a unit range into a range local to this segment, clamped to
    /// its content.
    pub fn local_range(&self, range: TextRange) -> std::ops::Range<usize> {
        let start = usize::from(range.start()).saturating_sub(self.start);
        let end = usize::from(range.end()).saturating_sub(self.start);
        start.min(self.content.len())..end.min(self.content.len())
    }
}

#[derive(Clone, Debug)]
struct SegmentEntry {
    path: String,
    content: String,
    start: usize,
}

#[derive(Clone, Debug, Default)]
pub struct SourceMap {
    entries: Vec<SegmentEntry>,
}

impl SourceMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Map for a unit that is exactly one source.
    pub fn single(path: &str, content: &str) -> Self {
        let mut map = Self::new();
        map.add_segment(path, content, 0);
        map
    }

    pub fn add_segment(&mut self, path: &str, content: &str, start: usize) {
        self.entries.push(SegmentEntry {
            path: path.to_owned(),
            content: content.to_owned(),
            start,
        });
    }

    /// Append `content` to `unit` followed by a newline separator and record
    /// the segment.
    pub fn append(&mut self, unit: &mut String, path: &str, content: &str) {
        let start = unit.len();
        unit.push_str(content);
        unit.push('\n');
        self.add_segment(path, content, start);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = Segment<'_>> {
        self.entries.iter().map(|e| Segment {
            path: &e.path,
            content: &e.content,
            start: e.start,
        })
    }

    /// Segment containing `offset`. The separator after a segment belongs to
    /// it, so end-of-file offsets still resolve.
    pub fn segment(&self, offset: usize) -> Option<Segment<'_>> {
        self.iter()
            .filter(|s| s.start <= offset && offset <= s.end())
            .last()
    }

    pub fn locate(&self, offset: usize) -> Option<Location> {
        let segment = self.segment(offset)?;
        let (line, col) = line_col(segment.content, offset - segment.start);
        Some(Location {
            file: segment.path.to_owned(),
            line,
            col,
        })
    }
}

/// 1-based line and character column of `offset` in `text`.
pub fn line_col(text: &str, offset: usize) -> (u32, u32) {
    let mut offset = offset.min(text.len());
    while !text.is_char_boundary(offset) {
        offset -= 1;
    }
    let before = &text[..offset];
    let line = before.matches('\n').count() + 1;
    let line_start = before.rfind('\n').map_or(0, |i| i + 1);
    let col = before[line_start..].chars().count() + 1;
    (line as u32, col as u32)
}
