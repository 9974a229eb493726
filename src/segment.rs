/*!
 * X12 segment and interchange primitives
 *
 * A segment is a segment ID plus its positional elements; an interchange
 * is the ordered list of segments making up one complete envelope.
 * Rendering and splitting both go through [`Delimiters`] so the canonical
 * separators live in one place.
 */

use std::fmt;
use serde::{Serialize, Deserialize};

use crate::constants::{ELEMENT_SEPARATOR, SEGMENT_TERMINATOR};

/// Separator characters used when rendering or splitting an interchange
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Delimiters {
    pub element: char,
    pub terminator: char,
    /// Whether rendered segments are separated by newlines for readability
    pub segment_newlines: bool,
}

impl Default for Delimiters {
    fn default() -> Self {
        Self {
            element: ELEMENT_SEPARATOR,
            terminator: SEGMENT_TERMINATOR,
            segment_newlines: true,
        }
    }
}

impl Delimiters {
    /// Compact delimiters with no newlines between segments
    pub fn compact() -> Self {
        Self {
            segment_newlines: false,
            ..Self::default()
        }
    }
}

/// A single X12 segment: an ID followed by positional elements
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Segment {
    pub id: String,
    pub elements: Vec<String>,
}

impl Segment {
    pub fn new(id: impl Into<String>, elements: Vec<String>) -> Self {
        Self {
            id: id.into(),
            elements,
        }
    }

    /// Parse one raw segment, tolerating surrounding whitespace and a
    /// trailing terminator. Returns `None` for empty input.
    pub fn parse(raw: &str) -> Option<Self> {
        let trimmed = raw.trim().trim_end_matches(SEGMENT_TERMINATOR);
        if trimmed.is_empty() {
            return None;
        }

        let mut parts = trimmed.split(ELEMENT_SEPARATOR);
        let id = parts.next()?.to_string();
        let elements = parts.map(|p| p.to_string()).collect();

        Some(Self { id, elements })
    }

    /// Element at a 1-based X12 position, so `element(1)` is ISA01
    pub fn element(&self, position: usize) -> Option<&str> {
        if position == 0 {
            return None;
        }
        self.elements.get(position - 1).map(|s| s.as_str())
    }

    /// Render with the given delimiters, including the terminator
    pub fn render(&self, delimiters: &Delimiters) -> String {
        let mut out = self.id.clone();
        for element in &self.elements {
            out.push(delimiters.element);
            out.push_str(element);
        }
        out.push(delimiters.terminator);
        out
    }
}

impl fmt::Display for Segment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.render(&Delimiters::default()))
    }
}

/// A complete X12 interchange with its assigned control number
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Interchange {
    pub segments: Vec<Segment>,
    /// Control number shared by ISA13, GS06, GE02, and IEA02
    pub control_number: String,
}

impl Interchange {
    /// Render the full interchange as wire text
    pub fn render(&self, delimiters: &Delimiters) -> String {
        let rendered: Vec<String> = self.segments.iter().map(|s| s.render(delimiters)).collect();
        if delimiters.segment_newlines {
            rendered.join("\n")
        } else {
            rendered.concat()
        }
    }

    /// First segment with the given ID
    pub fn find(&self, id: &str) -> Option<&Segment> {
        self.segments.iter().find(|s| s.id == id)
    }

    /// All segments with the given ID, in order
    pub fn find_all(&self, id: &str) -> Vec<&Segment> {
        self.segments.iter().filter(|s| s.id == id).collect()
    }

    /// Segment IDs in transmission order
    pub fn segment_ids(&self) -> Vec<&str> {
        self.segments.iter().map(|s| s.id.as_str()).collect()
    }
}

impl fmt::Display for Interchange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.render(&Delimiters::default()))
    }
}

/// Split raw X12 text into segments
///
/// Splits on the segment terminator when one is present, otherwise falls
/// back to newlines, so responses arrive delimiter-tolerant: compact
/// single-line payloads and pretty-printed multi-line ones both parse.
pub fn split_segments(raw: &str) -> Vec<Segment> {
    let pieces: Vec<&str> = if raw.contains(SEGMENT_TERMINATOR) {
        raw.split(SEGMENT_TERMINATOR).collect()
    } else {
        raw.lines().collect()
    };

    pieces.iter().filter_map(|p| Segment::parse(p)).collect()
}
