use crate::models::error::{LogSinkError, Result};
use serde::Deserialize;
use serde_json::Value;
use std::fmt;

/// One step of a [`FieldPath`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Segment {
    Key(String),
    Index(usize),
}

impl Segment {
    fn lookup<'a>(&self, node: &'a Value) -> Option<&'a Value> {
        match (self, node) {
            (Segment::Key(key), Value::Object(map)) => map.get(key),
            (Segment::Key(key), Value::Array(items)) => {
                key.parse::<usize>().ok().and_then(|idx| items.get(idx))
            }
            (Segment::Index(idx), Value::Array(items)) => items.get(*idx),
            (Segment::Index(idx), Value::Object(map)) => map.get(&idx.to_string()),
            _ => None,
        }
    }
}

/// A dot/bracket address into a log record, e.g. `req.user.id` or `items[0]["display.name"]`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(try_from = "String")]
pub struct FieldPath {
    raw: String,
    segments: Vec<Segment>,
}

impl FieldPath {
    pub fn parse(path: &str) -> Result<Self> {
        let invalid = |reason: &str| LogSinkError::InvalidFieldPath {
            path: path.to_string(),
            reason: reason.to_string(),
        };

        let mut segments = Vec::new();
        let mut current = String::new();
        // Set right after a bracket segment closes; only '.', '[' or the end may follow.
        let mut closed = false;
        let mut chars = path.chars();

        while let Some(c) = chars.next() {
            match c {
                '.' => {
                    if closed {
                        closed = false;
                    } else {
                        segments.push(Segment::Key(std::mem::take(&mut current)));
                    }
                }
                '[' => {
                    if !closed && !current.is_empty() {
                        segments.push(Segment::Key(std::mem::take(&mut current)));
                    }
                    let mut inner = String::new();
                    let mut terminated = false;
                    for c in chars.by_ref() {
                        if c == ']' {
                            terminated = true;
                            break;
                        }
                        inner.push(c);
                    }
                    if !terminated {
                        return Err(invalid("unclosed '['"));
                    }
                    let segment = Self::bracket_segment(&inner)
                        .ok_or_else(|| invalid("unterminated quote inside '[...]'"))?;
                    segments.push(segment);
                    closed = true;
                }
                ']' => return Err(invalid("unexpected ']'")),
                _ => {
                    if closed {
                        return Err(invalid("expected '.' or '[' after ']'"));
                    }
                    current.push(c);
                }
            }
        }

        if !closed {
            segments.push(Segment::Key(current));
        }

        Ok(FieldPath {
            raw: path.to_string(),
            segments,
        })
    }

    fn bracket_segment(inner: &str) -> Option<Segment> {
        for quote in ['"', '\''] {
            if let Some(rest) = inner.strip_prefix(quote) {
                return rest
                    .strip_suffix(quote)
                    .map(|key| Segment::Key(key.to_string()));
            }
        }
        if !inner.is_empty() && inner.bytes().all(|b| b.is_ascii_digit()) {
            if let Ok(idx) = inner.parse::<usize>() {
                return Some(Segment::Index(idx));
            }
        }
        Some(Segment::Key(inner.to_string()))
    }

    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    pub fn as_str(&self) -> &str {
        &self.raw
    }

    /// Walks `record` along the path. `None` means some segment was missing.
    ///
    /// A top-level key spelled exactly like the whole path wins over the split path, so
    /// `"a.b"` finds `{"a.b": 1}` before `{"a": {"b": 1}}`.
    pub fn resolve<'a>(&self, record: &'a Value) -> Option<&'a Value> {
        if let Some(value) = record.as_object().and_then(|map| map.get(&self.raw)) {
            return Some(value);
        }
        self.segments
            .iter()
            .try_fold(record, |node, segment| segment.lookup(node))
    }
}

impl TryFrom<String> for FieldPath {
    type Error = LogSinkError;

    fn try_from(value: String) -> Result<Self> {
        FieldPath::parse(&value)
    }
}

impl fmt::Display for FieldPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}
