//! Remote subtitle storage seam.
//!
//! Every operation is asynchronous from the caller's point of view: results
//! arrive through a one-shot callback, which may run before the call returns
//! (as with [`MemoryStorage`]) or at any later point on the UI thread.

use std::cell::RefCell;
use std::collections::BTreeMap;

use thiserror::Error;

use crate::model::{Language, Version};

#[derive(Debug, Clone, Error, PartialEq)]
pub enum StorageError {
    #[error("unknown language: {0}")]
    UnknownLanguage(String),
    #[error("no subtitles for {language_code} version {version}")]
    VersionNotFound { language_code: String, version: u32 },
    #[error("storage backend failed: {0}")]
    Backend(String),
}

/// One-shot completion callback.
pub type StorageCallback<T> = Box<dyn FnOnce(Result<T, StorageError>)>;

pub trait SubtitleStorage {
    /// All languages of the current video, with their versions.
    fn get_languages(&self, callback: StorageCallback<Vec<Language>>);

    /// Raw document of one version of one language.
    fn get_subtitles(&self, language_code: &str, version: u32, callback: StorageCallback<String>);

    /// Persist an edited document.
    fn save_subtitles(
        &self,
        video_id: &str,
        language_code: &str,
        document: String,
        callback: StorageCallback<()>,
    );
}

/// A document handed to [`SubtitleStorage::save_subtitles`].
#[derive(Debug, Clone, PartialEq)]
pub struct SavedDocument {
    pub video_id: String,
    pub language_code: String,
    pub document: String,
}

#[derive(Debug, Default)]
struct MemoryInner {
    languages: Vec<Language>,
    documents: BTreeMap<(String, u32), String>,
    saved: Vec<SavedDocument>,
}

/// Storage kept entirely in memory. Callbacks run synchronously.
///
/// Saving records the document and publishes it as a new version of the
/// language, so a later fetch of that version returns the saved text.
#[derive(Debug, Default)]
pub struct MemoryStorage {
    inner: RefCell<MemoryInner>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a language. Versions are added with [`Self::add_version`].
    pub fn add_language(&self, code: &str, name: &str, editing: bool) {
        let mut inner = self.inner.borrow_mut();
        if inner.languages.iter().any(|l| l.code == code) {
            return;
        }
        let mut language = Language::new(code, name);
        language.editing_language = editing;
        inner.languages.push(language);
    }

    pub fn add_version(&self, code: &str, number: u32, document: impl Into<String>) {
        let mut inner = self.inner.borrow_mut();
        if let Some(language) = inner.languages.iter_mut().find(|l| l.code == code)
            && language.version_mut(number).is_none()
        {
            language.versions.push(Version::new(number));
        }
        inner
            .documents
            .insert((code.to_string(), number), document.into());
    }

    /// Everything saved so far, oldest first.
    pub fn saved(&self) -> Vec<SavedDocument> {
        self.inner.borrow().saved.clone()
    }
}

impl SubtitleStorage for MemoryStorage {
    fn get_languages(&self, callback: StorageCallback<Vec<Language>>) {
        let languages = self.inner.borrow().languages.clone();
        callback(Ok(languages));
    }

    fn get_subtitles(&self, language_code: &str, version: u32, callback: StorageCallback<String>) {
        let result = {
            let inner = self.inner.borrow();
            if !inner.languages.iter().any(|l| l.code == language_code) {
                Err(StorageError::UnknownLanguage(language_code.to_string()))
            } else {
                inner
                    .documents
                    .get(&(language_code.to_string(), version))
                    .cloned()
                    .ok_or_else(|| StorageError::VersionNotFound {
                        language_code: language_code.to_string(),
                        version,
                    })
            }
        };
        callback(result);
    }

    fn save_subtitles(
        &self,
        video_id: &str,
        language_code: &str,
        document: String,
        callback: StorageCallback<()>,
    ) {
        let result = {
            let mut inner = self.inner.borrow_mut();
            let next = inner
                .languages
                .iter()
                .find(|l| l.code == language_code)
                .map(|l| l.versions.iter().map(|v| v.number).max().unwrap_or(0) + 1);
            match next {
                Some(number) => {
                    inner.saved.push(SavedDocument {
                        video_id: video_id.to_string(),
                        language_code: language_code.to_string(),
                        document: document.clone(),
                    });
                    if let Some(language) =
                        inner.languages.iter_mut().find(|l| l.code == language_code)
                    {
                        language.versions.push(Version::new(number));
                    }
                    inner
                        .documents
                        .insert((language_code.to_string(), number), document);
                    Ok(())
                }
                None => Err(StorageError::UnknownLanguage(language_code.to_string())),
            }
        };
        // The borrow is released before the callback can call back in.
        callback(result);
    }
}
