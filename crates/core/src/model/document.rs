use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum DocumentError {
    #[error("invalid document: {0}")]
    Json(#[from] serde_json::Error),
    #[error("no subtitle node at index {index} (document has {len})")]
    NoSuchNode { index: usize, len: usize },
}

/// A parsed subtitle document.
///
/// The editor only ever touches documents through this wrapper: the timeline
/// and list read cue times and rendered text from it, and edits are written
/// back before the document is serialized for saving. Nodes are addressed by
/// their position in the document.
pub trait SubtitleDocument {
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Start time of a node in milliseconds.
    fn start_time(&self, index: usize) -> Option<f64>;

    /// End time of a node in milliseconds.
    fn end_time(&self, index: usize) -> Option<f64>;

    /// Raw markup of a node, as the user edits it.
    fn content(&self, index: usize) -> Option<&str>;

    /// Display form of a node's markup.
    fn content_rendered(&self, index: usize) -> Option<String>;

    fn set_content(&mut self, index: usize, content: &str) -> Result<(), DocumentError>;

    fn set_times(&mut self, index: usize, start_ms: f64, end_ms: f64) -> Result<(), DocumentError>;

    /// Insert a node before `index` (`index == len` appends).
    fn insert(
        &mut self,
        index: usize,
        start_ms: f64,
        end_ms: f64,
        content: &str,
    ) -> Result<(), DocumentError>;

    fn remove(&mut self, index: usize) -> Result<(), DocumentError>;

    fn serialize(&self) -> Result<String, DocumentError>;
}

/// Turns raw storage payloads into documents.
pub trait DocumentParser {
    fn parse(&self, raw: &str) -> Result<Box<dyn SubtitleDocument>, DocumentError>;
}

/// A cue in the bundled JSON document format.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JsonCue {
    pub start: f64,
    pub end: f64,
    pub content: String,
}

/// Minimal JSON subtitle document:
///
/// ```json
/// { "language": "en", "subtitles": [ { "start": 0, "end": 1500, "content": "Hi *there*" } ] }
/// ```
///
/// Content uses a tiny markup: `**bold**`, `*italic*`, newlines for line
/// breaks.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct JsonDocument {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,
    #[serde(default)]
    pub subtitles: Vec<JsonCue>,
}

impl JsonDocument {
    pub fn from_json(raw: &str) -> Result<Self, DocumentError> {
        Ok(serde_json::from_str(raw)?)
    }

    fn cue(&self, index: usize) -> Result<&JsonCue, DocumentError> {
        self.subtitles.get(index).ok_or(DocumentError::NoSuchNode {
            index,
            len: self.subtitles.len(),
        })
    }

    fn cue_mut(&mut self, index: usize) -> Result<&mut JsonCue, DocumentError> {
        let len = self.subtitles.len();
        self.subtitles
            .get_mut(index)
            .ok_or(DocumentError::NoSuchNode { index, len })
    }
}

impl SubtitleDocument for JsonDocument {
    fn len(&self) -> usize {
        self.subtitles.len()
    }

    fn start_time(&self, index: usize) -> Option<f64> {
        self.subtitles.get(index).map(|c| c.start)
    }

    fn end_time(&self, index: usize) -> Option<f64> {
        self.subtitles.get(index).map(|c| c.end)
    }

    fn content(&self, index: usize) -> Option<&str> {
        self.subtitles.get(index).map(|c| c.content.as_str())
    }

    fn content_rendered(&self, index: usize) -> Option<String> {
        self.subtitles.get(index).map(|c| render_markup(&c.content))
    }

    fn set_content(&mut self, index: usize, content: &str) -> Result<(), DocumentError> {
        self.cue_mut(index)?.content = content.to_string();
        Ok(())
    }

    fn set_times(&mut self, index: usize, start_ms: f64, end_ms: f64) -> Result<(), DocumentError> {
        let cue = self.cue_mut(index)?;
        cue.start = start_ms;
        cue.end = end_ms;
        Ok(())
    }

    fn insert(
        &mut self,
        index: usize,
        start_ms: f64,
        end_ms: f64,
        content: &str,
    ) -> Result<(), DocumentError> {
        if index > self.subtitles.len() {
            return Err(DocumentError::NoSuchNode {
                index,
                len: self.subtitles.len(),
            });
        }
        self.subtitles.insert(
            index,
            JsonCue {
                start: start_ms,
                end: end_ms,
                content: content.to_string(),
            },
        );
        Ok(())
    }

    fn remove(&mut self, index: usize) -> Result<(), DocumentError> {
        self.cue(index)?;
        self.subtitles.remove(index);
        Ok(())
    }

    fn serialize(&self) -> Result<String, DocumentError> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

/// Parser for [`JsonDocument`].
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonDocumentParser;

impl DocumentParser for JsonDocumentParser {
    fn parse(&self, raw: &str) -> Result<Box<dyn SubtitleDocument>, DocumentError> {
        Ok(Box::new(JsonDocument::from_json(raw)?))
    }
}

/// Render the cue markup to HTML. Unclosed spans are closed at the end.
fn render_markup(content: &str) -> String {
    let mut out = String::with_capacity(content.len() + 16);
    let mut bold = false;
    let mut italic = false;
    let mut chars = content.trim().chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            '*' if chars.peek() == Some(&'*') => {
                chars.next();
                out.push_str(if bold { "</b>" } else { "<b>" });
                bold = !bold;
            }
            '*' => {
                out.push_str(if italic { "</i>" } else { "<i>" });
                italic = !italic;
            }
            '\n' => out.push_str("<br>"),
            '\r' => {}
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            _ => out.push(c),
        }
    }
    if italic {
        out.push_str("</i>");
    }
    if bold {
        out.push_str("</b>");
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    const RAW: &str = r#"{
        "language": "en",
        "subtitles": [
            { "start": 0, "end": 1500, "content": "Hello *there*" },
            { "start": 2000, "end": 4000, "content": "Line one\nline **two**" }
        ]
    }"#;

    fn parsed() -> Box<dyn SubtitleDocument> {
        JsonDocumentParser
            .parse(RAW)
            .unwrap_or_else(|_| Box::new(JsonDocument::default()))
    }

    #[test]
    fn parses_cues() {
        let doc = parsed();
        assert_eq!(doc.len(), 2);
        assert_eq!(doc.start_time(1), Some(2000.0));
        assert_eq!(doc.end_time(1), Some(4000.0));
        assert_eq!(doc.content(0), Some("Hello *there*"));
        assert_eq!(doc.start_time(2), None);
    }

    #[test]
    fn renders_markup() {
        let doc = parsed();
        assert_eq!(doc.content_rendered(0).as_deref(), Some("Hello <i>there</i>"));
        assert_eq!(
            doc.content_rendered(1).as_deref(),
            Some("Line one<br>line <b>two</b>")
        );
    }

    #[test]
    fn rendering_escapes_and_closes_spans() {
        assert_eq!(render_markup("a < b & **c"), "a &lt; b &amp; <b>c</b>");
    }

    #[test]
    fn edits_survive_serialization() {
        let mut doc = parsed();
        assert!(doc.set_content(0, "Bye").is_ok());
        assert!(doc.set_times(1, 2100.0, 3900.0).is_ok());
        assert!(doc.insert(2, 5000.0, 6000.0, "new").is_ok());
        assert!(doc.remove(0).is_ok());

        let out = doc.serialize().unwrap_or_default();
        let reparsed = JsonDocument::from_json(&out).unwrap_or_default();
        assert_eq!(reparsed.language.as_deref(), Some("en"));
        assert_eq!(reparsed.subtitles.len(), 2);
        assert_eq!(reparsed.subtitles[0].start, 2100.0);
        assert_eq!(reparsed.subtitles[1].content, "new");
    }

    #[test]
    fn out_of_range_edits_fail() {
        let mut doc = parsed();
        assert!(matches!(
            doc.set_content(5, "x"),
            Err(DocumentError::NoSuchNode { index: 5, len: 2 })
        ));
        assert!(doc.insert(3, 0.0, 1.0, "x").is_err());
        assert!(doc.remove(2).is_err());
    }

    #[test]
    fn rejects_malformed_json() {
        assert!(matches!(
            JsonDocumentParser.parse("{ not json"),
            Err(DocumentError::Json(_))
        ));
    }
}
