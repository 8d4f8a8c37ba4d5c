//! Static JSON paths into provider response documents

use serde_json::Value;
use std::fmt;

/// One step of a [`JsonPath`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PathSegment {
    Key(&'static str),
    Index(usize),
}

/// An ordered, compile-time path such as `choices[0].delta.content`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct JsonPath(pub &'static [PathSegment]);

/// The first segment that could not be followed
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathMiss {
    /// Path rendered up to and including the missing segment
    pub at: String,
}

impl JsonPath {
    /// Walk the path, failing at the first missing segment.
    pub fn lookup<'a>(&self, root: &'a Value) -> Result<&'a Value, PathMiss> {
        let mut current = root;
        for (depth, segment) in self.0.iter().enumerate() {
            let next = match segment {
                PathSegment::Key(key) => current.get(*key),
                PathSegment::Index(index) => current.get(*index),
            };
            current = next.ok_or_else(|| PathMiss {
                at: JsonPath(&self.0[..=depth]).to_string(),
            })?;
        }
        Ok(current)
    }

    /// Non-empty string at the end of the path, if any
    pub fn text_at<'a>(&self, root: &'a Value) -> Option<&'a str> {
        self.lookup(root)
            .ok()
            .and_then(Value::as_str)
            .filter(|s| !s.is_empty())
    }
}

impl fmt::Display for JsonPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, segment) in self.0.iter().enumerate() {
            match segment {
                PathSegment::Key(key) if i == 0 => write!(f, "{}", key)?,
                PathSegment::Key(key) => write!(f, ".{}", key)?,
                PathSegment::Index(index) => write!(f, "[{}]", index)?,
            }
        }
        Ok(())
    }
}
