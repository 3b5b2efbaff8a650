use serde::{Deserialize, Serialize};

/// A published version of a language's subtitles.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Version {
    pub number: u32,
    /// Raw document, once it has been fetched.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subtitles: Option<String>,
}

impl Version {
    pub fn new(number: u32) -> Self {
        Self {
            number,
            subtitles: None,
        }
    }
}

/// A subtitle language available for a video.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Language {
    pub code: String,
    pub name: String,
    /// The language currently being edited.
    #[serde(default)]
    pub editing_language: bool,
    #[serde(default)]
    pub versions: Vec<Version>,
}

impl Language {
    pub fn new(code: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            name: name.into(),
            editing_language: false,
            versions: Vec::new(),
        }
    }

    /// Versions ordered newest first.
    pub fn versions_newest_first(&self) -> Vec<Version> {
        let mut versions = self.versions.clone();
        versions.sort_by(|a, b| b.number.cmp(&a.number));
        versions
    }

    pub fn version_mut(&mut self, number: u32) -> Option<&mut Version> {
        self.versions.iter_mut().find(|v| v.number == number)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn versions_sorted_newest_first() {
        let mut lang = Language::new("fr", "French");
        lang.versions = vec![Version::new(2), Version::new(7), Version::new(1)];
        let numbers: Vec<_> = lang.versions_newest_first().iter().map(|v| v.number).collect();
        assert_eq!(numbers, vec![7, 2, 1]);
    }

    #[test]
    fn deserializes_with_defaults() {
        let lang: Option<Language> =
            serde_json::from_str(r#"{ "code": "de", "name": "German" }"#).ok();
        let lang = lang.unwrap_or_else(|| Language::new("", ""));
        assert_eq!(lang.code, "de");
        assert!(!lang.editing_language);
        assert!(lang.versions.is_empty());
    }
}
