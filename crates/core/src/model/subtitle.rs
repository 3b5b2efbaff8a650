use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Identifier of a subtitle, stable across render passes and edits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SubtitleId(pub u64);

impl std::fmt::Display for SubtitleId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// One subtitle cue.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Subtitle {
    pub id: SubtitleId,
    /// Start time in milliseconds.
    pub start_time: f64,
    /// End time in milliseconds.
    pub end_time: f64,
    /// Rendered display text.
    pub text: String,
}

impl Subtitle {
    pub fn duration(&self) -> f64 {
        self.end_time - self.start_time
    }

    /// Whether the cue intersects the half-open range `[start_ms, end_ms)`.
    pub fn overlaps(&self, start_ms: f64, end_ms: f64) -> bool {
        self.start_time < end_ms && self.end_time > start_ms
    }
}

#[derive(Debug, Error, PartialEq)]
pub enum CollectionError {
    #[error("no subtitle with id {0}")]
    UnknownSubtitle(SubtitleId),
    #[error("subtitle times must be finite (got {start} to {end})")]
    NonFiniteTime { start: f64, end: f64 },
}

/// The subtitle store the timeline reads from and commits edits into.
pub trait SubtitleCollection {
    /// Subtitles overlapping `[start_ms, end_ms)`, ordered by start time.
    fn subtitles_for_time(&self, start_ms: f64, end_ms: f64) -> Vec<&Subtitle>;

    fn subtitle(&self, id: SubtitleId) -> Option<&Subtitle>;

    /// Replace both times of one subtitle in a single update.
    fn update_subtitle_time(
        &mut self,
        id: SubtitleId,
        start_ms: f64,
        end_ms: f64,
    ) -> Result<(), CollectionError>;
}

/// In-memory subtitle collection kept in document order.
///
/// Enforces its own timing invariants on update: a start time never goes
/// below zero and an end time never precedes its start.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SubtitleList {
    subtitles: Vec<Subtitle>,
    next_id: u64,
}

impl SubtitleList {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a subtitle and return its freshly allocated id.
    pub fn push(&mut self, start_ms: f64, end_ms: f64, text: impl Into<String>) -> SubtitleId {
        let index = self.subtitles.len();
        self.insert(index, start_ms, end_ms, text)
    }

    /// Insert a subtitle at a document position. Panics if `index > len`.
    pub fn insert(
        &mut self,
        index: usize,
        start_ms: f64,
        end_ms: f64,
        text: impl Into<String>,
    ) -> SubtitleId {
        let id = SubtitleId(self.next_id);
        self.next_id += 1;
        self.subtitles.insert(
            index,
            Subtitle {
                id,
                start_time: start_ms,
                end_time: end_ms,
                text: text.into(),
            },
        );
        id
    }

    pub fn remove(&mut self, id: SubtitleId) -> Option<Subtitle> {
        let pos = self.subtitles.iter().position(|s| s.id == id)?;
        Some(self.subtitles.remove(pos))
    }

    pub fn set_text(&mut self, id: SubtitleId, text: impl Into<String>) -> Result<(), CollectionError> {
        let subtitle = self
            .subtitles
            .iter_mut()
            .find(|s| s.id == id)
            .ok_or(CollectionError::UnknownSubtitle(id))?;
        subtitle.text = text.into();
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.subtitles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.subtitles.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Subtitle> {
        self.subtitles.iter()
    }
}

impl SubtitleCollection for SubtitleList {
    fn subtitles_for_time(&self, start_ms: f64, end_ms: f64) -> Vec<&Subtitle> {
        let mut visible: Vec<&Subtitle> = self
            .subtitles
            .iter()
            .filter(|s| s.overlaps(start_ms, end_ms))
            .collect();
        visible.sort_by(|a, b| a.start_time.total_cmp(&b.start_time));
        visible
    }

    fn subtitle(&self, id: SubtitleId) -> Option<&Subtitle> {
        self.subtitles.iter().find(|s| s.id == id)
    }

    fn update_subtitle_time(
        &mut self,
        id: SubtitleId,
        start_ms: f64,
        end_ms: f64,
    ) -> Result<(), CollectionError> {
        if !start_ms.is_finite() || !end_ms.is_finite() {
            return Err(CollectionError::NonFiniteTime {
                start: start_ms,
                end: end_ms,
            });
        }
        let subtitle = self
            .subtitles
            .iter_mut()
            .find(|s| s.id == id)
            .ok_or(CollectionError::UnknownSubtitle(id))?;

        let start = start_ms.max(0.0);
        subtitle.start_time = start;
        subtitle.end_time = end_ms.max(start);
        Ok(())
    }
}
