use std::fmt;
use std::ops::Range;

use serde::{Deserialize, Serialize};
use xi_rope::{LinesMetric, Rope};

/// Errors raised when a value operation would corrupt the format model.
///
/// These fail fast on purpose: a malformed annotation silently written into
/// a value would desynchronize the rendered list structure from the document
/// with no way to recover. Callers propagate these to the value owner rather
/// than catching and continuing.
#[derive(Debug, thiserror::Error)]
pub enum FormatError {
    #[error("line range {range} is malformed for a document of {line_count} lines")]
    MalformedRange { range: LineRange, line_count: usize },
    #[error("annotations {first} and {second} overlap")]
    OverlappingAnnotations {
        first: LineAnnotation,
        second: LineAnnotation,
    },
}

/// List semantics a line-format annotation or a root container can carry.
///
/// The serialized form uses the HTML tag names so the host document model
/// can round-trip it unchanged.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ListTag {
    #[serde(rename = "ul")]
    Unordered,
    #[serde(rename = "ol")]
    Ordered,
}

impl ListTag {
    pub fn tag_name(self) -> &'static str {
        match self {
            ListTag::Unordered => "ul",
            ListTag::Ordered => "ol",
        }
    }

    pub fn from_tag_name(name: &str) -> Option<Self> {
        match name {
            "ul" => Some(ListTag::Unordered),
            "ol" => Some(ListTag::Ordered),
            _ => None,
        }
    }
}

impl fmt::Display for ListTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag_name())
    }
}

/// A contiguous run of lines, half-open over zero-based line indices.
///
/// Ranges identify whole lines (paragraph-like units), never character
/// offsets. An empty or out-of-bounds range is malformed and rejected by
/// every operation that stores one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineRange {
    pub start: usize,
    pub end: usize,
}

impl LineRange {
    pub fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }

    pub fn contains(&self, line: usize) -> bool {
        self.start <= line && line < self.end
    }

    pub fn intersects(&self, other: LineRange) -> bool {
        self.start < other.end && other.start < self.end
    }

    fn validate(&self, line_count: usize) -> Result<(), FormatError> {
        if self.start >= self.end || self.end > line_count {
            return Err(FormatError::MalformedRange {
                range: *self,
                line_count,
            });
        }
        Ok(())
    }
}

impl fmt::Display for LineRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}..{}", self.start, self.end)
    }
}

/// A line-format annotation: the given run of lines renders as items of a
/// `tag` list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineAnnotation {
    pub tag: ListTag,
    pub lines: LineRange,
}

impl fmt::Display for LineAnnotation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}", self.tag, self.lines)
    }
}

/// A text-with-formatting value: rope buffer, byte-offset selection, and
/// line-format annotations.
///
/// Values are copy-on-write. `apply_line_format` and `remove_line_format`
/// take `&self` and produce a fresh value with a bumped version; the input
/// is never mutated, so the owner can keep the previous version until the
/// new one is accepted. Annotations are kept sorted, non-overlapping, and
/// coalesced (adjacent same-tag runs merge into one).
///
/// The selection is a byte range into the buffer. Operations derive the set
/// of touched lines from it; a collapsed selection touches the caret line.
#[derive(Debug, Clone)]
pub struct RichTextValue {
    text: Rope,
    selection: Range<usize>,
    annotations: Vec<LineAnnotation>,
    version: u64,
}

impl RichTextValue {
    /// Create a value from plain text with no annotations and the caret at
    /// the end.
    pub fn from_plain_text(text: &str) -> Self {
        let text = Rope::from(text);
        let len = text.len();
        Self {
            text,
            selection: len..len,
            annotations: Vec::new(),
            version: 0,
        }
    }

    /// Replace the annotation set wholesale, validating every range against
    /// the current text.
    pub fn with_annotations(
        mut self,
        annotations: Vec<LineAnnotation>,
    ) -> Result<Self, FormatError> {
        let line_count = self.line_count();
        for annotation in &annotations {
            annotation.lines.validate(line_count)?;
        }
        check_disjoint(&annotations)?;
        self.annotations = coalesce(annotations);
        Ok(self)
    }

    pub fn text(&self) -> &Rope {
        &self.text
    }

    pub fn to_plain_text(&self) -> String {
        self.text.to_string()
    }

    /// Number of lines in the buffer. An empty buffer still has one line.
    pub fn line_count(&self) -> usize {
        self.text.measure::<LinesMetric>() + 1
    }

    pub fn selection(&self) -> Range<usize> {
        self.selection.clone()
    }

    /// Set the selection as byte offsets, clamped to the buffer bounds.
    /// Out-of-range offsets are expected when the host's state has moved on;
    /// they are clamped rather than rejected.
    pub fn set_selection(&mut self, selection: Range<usize>) {
        let len = self.text.len();
        let start = selection.start.min(len);
        let end = selection.end.min(len).max(start);
        self.selection = start..end;
    }

    pub fn version(&self) -> u64 {
        self.version
    }

    pub fn annotations(&self) -> &[LineAnnotation] {
        &self.annotations
    }

    /// The annotation tag covering the given line, if any.
    pub fn line_format(&self, line: usize) -> Option<ListTag> {
        self.annotations
            .iter()
            .find(|a| a.lines.contains(line))
            .map(|a| a.tag)
    }

    /// The run of lines the current selection touches.
    ///
    /// A selection ending exactly at the start of a line does not touch
    /// that line, so selecting one full line including its newline stays a
    /// single-line span.
    pub fn selected_lines(&self) -> LineRange {
        let len = self.text.len();
        let start = self.selection.start.min(len);
        let end = self.selection.end.min(len).max(start);

        let first = self.text.line_of_offset(start);
        let last = {
            let line = self.text.line_of_offset(end);
            if end > start && line > 0 && self.text.offset_of_line(line) == end {
                line - 1
            } else {
                line
            }
        };
        LineRange::new(first, last + 1)
    }

    /// Set the line format of every selected line to `tag`, replacing
    /// whatever annotations those lines carried. Lines with heterogeneous
    /// existing annotations are normalized uniformly to the requested tag.
    ///
    /// Pure function of `(value, selection)`; returns the new value.
    pub fn apply_line_format(&self, tag: ListTag) -> Result<Self, FormatError> {
        self.check_annotations()?;
        let span = self.selected_lines();
        span.validate(self.line_count())?;

        let mut annotations = carve(&self.annotations, span);
        annotations.push(LineAnnotation { tag, lines: span });
        Ok(self.replaced(coalesce(annotations)))
    }

    /// Strip the line-format annotation, of any tag, from every selected
    /// line. Unannotated lines are left alone, so removal is idempotent.
    ///
    /// Pure function of `(value, selection)`; returns the new value.
    pub fn remove_line_format(&self) -> Result<Self, FormatError> {
        self.check_annotations()?;
        let span = self.selected_lines();
        span.validate(self.line_count())?;

        Ok(self.replaced(carve(&self.annotations, span)))
    }

    fn replaced(&self, annotations: Vec<LineAnnotation>) -> Self {
        Self {
            text: self.text.clone(),
            selection: self.selection.clone(),
            annotations,
            version: self.version + 1,
        }
    }

    /// Bypass validation to build known-bad values for failure tests.
    #[cfg(test)]
    pub(crate) fn with_raw_annotations(mut self, annotations: Vec<LineAnnotation>) -> Self {
        self.annotations = annotations;
        self
    }

    fn check_annotations(&self) -> Result<(), FormatError> {
        let line_count = self.line_count();
        for annotation in &self.annotations {
            annotation.lines.validate(line_count)?;
        }
        check_disjoint(&self.annotations)
    }
}

impl PartialEq for RichTextValue {
    fn eq(&self, other: &Self) -> bool {
        // Compare buffer content as strings; the version is a change
        // counter, not part of value identity.
        self.text.to_string() == other.text.to_string()
            && self.selection == other.selection
            && self.annotations == other.annotations
    }
}

/// A line belongs to at most one list, so any two annotations overlapping
/// is malformed state, not just two of the same tag.
fn check_disjoint(annotations: &[LineAnnotation]) -> Result<(), FormatError> {
    for (ix, first) in annotations.iter().enumerate() {
        for second in &annotations[ix + 1..] {
            if first.lines.intersects(second.lines) {
                return Err(FormatError::OverlappingAnnotations {
                    first: *first,
                    second: *second,
                });
            }
        }
    }
    Ok(())
}

/// Remove `span` from every annotation, keeping the parts that stick out on
/// either side.
fn carve(annotations: &[LineAnnotation], span: LineRange) -> Vec<LineAnnotation> {
    let mut out = Vec::with_capacity(annotations.len() + 1);
    for annotation in annotations {
        if !annotation.lines.intersects(span) {
            out.push(*annotation);
            continue;
        }
        if annotation.lines.start < span.start {
            out.push(LineAnnotation {
                tag: annotation.tag,
                lines: LineRange::new(annotation.lines.start, span.start),
            });
        }
        if annotation.lines.end > span.end {
            out.push(LineAnnotation {
                tag: annotation.tag,
                lines: LineRange::new(span.end, annotation.lines.end),
            });
        }
    }
    out
}

/// Sort by start line and merge adjacent same-tag runs.
fn coalesce(mut annotations: Vec<LineAnnotation>) -> Vec<LineAnnotation> {
    annotations.sort_by_key(|a| a.lines.start);
    let mut out: Vec<LineAnnotation> = Vec::with_capacity(annotations.len());
    for annotation in annotations {
        if let Some(prev) = out.last_mut()
            && prev.tag == annotation.tag
            && prev.lines.end == annotation.lines.start
        {
            prev.lines.end = annotation.lines.end;
            continue;
        }
        out.push(annotation);
    }
    out
}
