//! Canonical in-app paths

use serde::{Deserialize, Serialize};
use std::fmt;

/// The scheme-independent route every deep link is normalized to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CanonicalPath {
    /// `/`
    Root,
    /// `/settings`
    Settings,
    /// `/student/{id}`
    Student { student_id: i64 },
    /// `/student/{id}/message/{id}`
    Message { student_id: i64, message_id: i64 },
    /// Sentinel for malformed or unrecognized input
    Error,
}

impl CanonicalPath {
    /// Parse a path in the canonical grammar.
    ///
    /// Query and fragment are ignored, empty segments collapse, and `home` /
    /// `index` alias the root. Anything else resolves to [`CanonicalPath::Error`].
    pub fn parse(path: &str) -> Self {
        let path = path.split(['?', '#']).next().unwrap_or_default();
        let segments: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();

        match segments.as_slice() {
            [] | ["home"] | ["index"] => CanonicalPath::Root,
            ["settings"] => CanonicalPath::Settings,
            ["student", id] => match parse_id(id) {
                Some(student_id) => CanonicalPath::Student { student_id },
                None => CanonicalPath::Error,
            },
            ["student", id, "message", msg] => match (parse_id(id), parse_id(msg)) {
                (Some(student_id), Some(message_id)) => CanonicalPath::Message {
                    student_id,
                    message_id,
                },
                _ => CanonicalPath::Error,
            },
            _ => CanonicalPath::Error,
        }
    }

    pub fn is_error(&self) -> bool {
        matches!(self, CanonicalPath::Error)
    }

    pub fn student_id(&self) -> Option<i64> {
        match self {
            CanonicalPath::Student { student_id } | CanonicalPath::Message { student_id, .. } => {
                Some(*student_id)
            }
            _ => None,
        }
    }

    pub fn message_id(&self) -> Option<i64> {
        match self {
            CanonicalPath::Message { message_id, .. } => Some(*message_id),
            _ => None,
        }
    }
}

/// Positive decimal ids only
pub(crate) fn parse_id(raw: &str) -> Option<i64> {
    if raw.is_empty() || !raw.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    raw.parse::<i64>().ok().filter(|id| *id > 0)
}

impl fmt::Display for CanonicalPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CanonicalPath::Root => write!(f, "/"),
            CanonicalPath::Settings => write!(f, "/settings"),
            CanonicalPath::Student { student_id } => write!(f, "/student/{}", student_id),
            CanonicalPath::Message {
                student_id,
                message_id,
            } => write!(f, "/student/{}/message/{}", student_id, message_id),
            CanonicalPath::Error => write!(f, "error"),
        }
    }
}
