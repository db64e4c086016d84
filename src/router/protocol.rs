//! Line protocol between the router and its child agents

use serde::{Deserialize, Serialize};

/// Lines that end a response under sentinel framing
pub const SENTINEL_MARKERS: &[&str] = &["-------------------", ">>>"];

/// How a child delimits its answers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Framing {
    /// One JSON frame per line, answers closed by `done` or `error`
    #[default]
    Json,
    /// Raw text, answers closed by a line containing a marker
    Sentinel,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestFrame {
    pub id: String,
    pub instruction: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ResponseFrame {
    Ready,
    Message { id: String, text: String },
    Done { id: String },
    Error { id: String, message: String },
}

impl RequestFrame {
    pub fn encode(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }
}

impl ResponseFrame {
    pub fn encode(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }

    /// `None` for lines that are not frames (stray prints, log lines)
    pub fn parse(line: &str) -> Option<Self> {
        let line = line.trim();
        if !line.starts_with('{') {
            return None;
        }
        serde_json::from_str(line).ok()
    }

    /// Request id this frame answers, if any
    pub fn id(&self) -> Option<&str> {
        match self {
            ResponseFrame::Ready => None,
            ResponseFrame::Message { id, .. }
            | ResponseFrame::Done { id }
            | ResponseFrame::Error { id, .. } => Some(id),
        }
    }
}

pub fn is_sentinel(line: &str) -> bool {
    SENTINEL_MARKERS.iter().any(|m| line.contains(m))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn frames_use_kind_tag() {
        let frame = ResponseFrame::Message {
            id: "a".to_string(),
            text: "hi".to_string(),
        };
        assert_eq!(
            frame.encode().unwrap(),
            r#"{"kind":"message","id":"a","text":"hi"}"#
        );
        assert_eq!(ResponseFrame::Ready.encode().unwrap(), r#"{"kind":"ready"}"#);
    }

    #[test]
    fn parse_skips_non_frames() {
        assert_eq!(ResponseFrame::parse("Loading wallet..."), None);
        assert_eq!(ResponseFrame::parse(r#"{"kind":"unknown"}"#), None);
        assert_eq!(
            ResponseFrame::parse(r#"  {"kind":"done","id":"x"}  "#),
            Some(ResponseFrame::Done { id: "x".to_string() })
        );
    }

    #[test]
    fn sentinel_markers_match_inside_lines() {
        assert!(is_sentinel("-------------------"));
        assert!(is_sentinel(">>> ready"));
        assert!(!is_sentinel("balance is 1 ETH"));
    }

    #[test]
    fn framing_names() {
        let f: Framing = serde_json::from_str("\"sentinel\"").unwrap();
        assert_eq!(f, Framing::Sentinel);
        assert_eq!(Framing::default(), Framing::Json);
    }
}
