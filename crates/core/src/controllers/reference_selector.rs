use std::cell::RefCell;
use std::collections::VecDeque;
use std::rc::Rc;

use crate::model::{Language, Version};
use crate::storage::{StorageError, SubtitleStorage};

use super::subtitle_list::SubtitleListController;

enum Completion {
    Languages(Result<Vec<Language>, StorageError>),
    Subtitles {
        language_code: String,
        version: u32,
        result: Result<String, StorageError>,
    },
}

/// Picks the reference language and version shown next to the working
/// subtitles, and loads that version into the reference list.
///
/// Fetched documents are cached on their [`Version`], so switching back to a
/// version already seen does not hit storage again.
pub struct ReferenceSelector {
    storage: Rc<dyn SubtitleStorage>,
    languages: Vec<Language>,
    language: Option<String>,
    versions: Vec<Version>,
    version: Option<u32>,
    inbox: Rc<RefCell<VecDeque<Completion>>>,
}

impl ReferenceSelector {
    pub fn new(storage: Rc<dyn SubtitleStorage>) -> Self {
        Self {
            storage,
            languages: Vec::new(),
            language: None,
            versions: Vec::new(),
            version: None,
            inbox: Rc::default(),
        }
    }

    pub fn languages(&self) -> &[Language] {
        &self.languages
    }

    /// The selected language.
    pub fn language(&self) -> Option<&Language> {
        let code = self.language.as_deref()?;
        self.languages.iter().find(|l| l.code == code)
    }

    /// Versions of the selected language, newest first.
    pub fn versions(&self) -> &[Version] {
        &self.versions
    }

    pub fn version(&self) -> Option<u32> {
        self.version
    }

    /// Ask storage for the languages of the video.
    pub fn load_languages(&mut self, reference: &mut SubtitleListController) {
        let inbox = Rc::clone(&self.inbox);
        self.storage.get_languages(Box::new(move |result| {
            inbox.borrow_mut().push_back(Completion::Languages(result))
        }));
        self.pump(reference);
    }

    /// Apply storage completions that arrived since the last call.
    pub fn pump(&mut self, reference: &mut SubtitleListController) -> bool {
        let completions: Vec<_> = self.inbox.borrow_mut().drain(..).collect();
        let changed = !completions.is_empty();
        for completion in completions {
            match completion {
                Completion::Languages(Ok(languages)) => {
                    self.on_languages_loaded(languages, reference);
                }
                Completion::Languages(Err(err)) => {
                    log::warn!("reference languages unavailable: {err}");
                    self.languages.clear();
                    self.language = None;
                    self.versions.clear();
                    self.version = None;
                    reference.fetch_failed(&err);
                }
                Completion::Subtitles {
                    language_code,
                    version,
                    result: Ok(raw),
                } => {
                    self.cache(&language_code, version, &raw);
                    // A slow fetch for a version no longer selected is only cached.
                    if self.language.as_deref() == Some(language_code.as_str())
                        && self.version == Some(version)
                    {
                        self.set_reference_subs(&raw, reference);
                    }
                }
                Completion::Subtitles {
                    language_code,
                    version,
                    result: Err(err),
                } => {
                    log::warn!("reference {language_code} v{version} unavailable: {err}");
                    if self.language.as_deref() == Some(language_code.as_str())
                        && self.version == Some(version)
                    {
                        reference.fetch_failed(&err);
                    }
                }
            }
        }
        changed
    }

    /// Store the languages and select the one being edited.
    pub fn on_languages_loaded(
        &mut self,
        languages: Vec<Language>,
        reference: &mut SubtitleListController,
    ) {
        log::info!("{} reference languages available", languages.len());
        self.language = languages
            .iter()
            .find(|l| l.editing_language)
            .map(|l| l.code.clone());
        self.languages = languages;
        self.language_select_changed(None, reference);
    }

    /// Switch to `code`, or refresh the current language when `None`. The
    /// newest version becomes selected.
    pub fn language_select_changed(
        &mut self,
        code: Option<&str>,
        reference: &mut SubtitleListController,
    ) {
        if let Some(code) = code {
            self.language = Some(code.to_string());
        }
        let Some(versions) = self.language().map(Language::versions_newest_first) else {
            self.versions.clear();
            self.version = None;
            return;
        };
        self.versions = versions;
        self.version = self.versions.first().map(|v| v.number);
        self.version_changed(reference);
    }

    pub fn select_version(&mut self, number: u32, reference: &mut SubtitleListController) {
        if self.version == Some(number) {
            return;
        }
        self.version = Some(number);
        self.version_changed(reference);
    }

    /// Show the selected version, from cache when possible.
    pub fn version_changed(&mut self, reference: &mut SubtitleListController) {
        let (Some(code), Some(number)) = (self.language.clone(), self.version) else {
            return;
        };
        let cached = self
            .versions
            .iter()
            .find(|v| v.number == number)
            .and_then(|v| v.subtitles.clone());
        if let Some(raw) = cached {
            self.set_reference_subs(&raw, reference);
            return;
        }

        let inbox = Rc::clone(&self.inbox);
        let language_code = code.clone();
        self.storage.get_subtitles(
            &code,
            number,
            Box::new(move |result| {
                inbox.borrow_mut().push_back(Completion::Subtitles {
                    language_code,
                    version: number,
                    result,
                })
            }),
        );
        self.pump(reference);
    }

    pub fn set_reference_subs(&self, raw: &str, reference: &mut SubtitleListController) {
        if let Err(err) = reference.on_subtitles_fetched(raw) {
            log::warn!("reference subtitles rejected: {err}");
        }
    }

    fn cache(&mut self, language_code: &str, number: u32, raw: &str) {
        if let Some(version) = self
            .languages
            .iter_mut()
            .find(|l| l.code == language_code)
            .and_then(|l| l.version_mut(number))
        {
            version.subtitles = Some(raw.to_string());
        }
        if self.language.as_deref() == Some(language_code)
            && let Some(version) = self.versions.iter_mut().find(|v| v.number == number)
        {
            version.subtitles = Some(raw.to_string());
        }
    }
}

impl std::fmt::Debug for ReferenceSelector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReferenceSelector")
            .field("languages", &self.languages.len())
            .field("language", &self.language)
            .field("version", &self.version)
            .finish()
    }
}
