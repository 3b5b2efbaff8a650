pub mod document;
pub mod language;
pub mod subtitle;

pub use document::{DocumentError, DocumentParser, JsonCue, JsonDocument, JsonDocumentParser, SubtitleDocument};
pub use language::{Language, Version};
pub use subtitle::{CollectionError, Subtitle, SubtitleCollection, SubtitleId, SubtitleList};
