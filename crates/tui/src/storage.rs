use std::collections::BTreeMap;
use std::io;
use std::path::{Path, PathBuf};

use subline_core::model::{Language, Version};
use subline_core::storage::{StorageCallback, StorageError, SubtitleStorage};

/// Optional `{ "en": "English", ... }` map of display names.
const NAMES_FILE: &str = "languages.json";

/// Subtitle versions kept as files in one directory.
///
/// Each version of each language is a document named `<code>.v<N>.json`.
/// Saving writes the next version number of the language. Callbacks run
/// before the call returns.
pub struct DirStorage {
    dir: PathBuf,
    editing: String,
    names: BTreeMap<String, String>,
}

impl DirStorage {
    pub fn open(dir: impl Into<PathBuf>, editing: impl Into<String>) -> io::Result<Self> {
        let dir = dir.into();
        if !dir.is_dir() {
            return Err(io::Error::new(
                io::ErrorKind::NotFound,
                format!("{} is not a directory", dir.display()),
            ));
        }
        let names = match std::fs::read_to_string(dir.join(NAMES_FILE)) {
            Ok(raw) => serde_json::from_str(&raw).unwrap_or_else(|e| {
                log::warn!("ignoring {NAMES_FILE}: {e}");
                BTreeMap::new()
            }),
            Err(_) => BTreeMap::new(),
        };
        Ok(Self {
            dir,
            editing: editing.into(),
            names,
        })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path(&self, code: &str, version: u32) -> PathBuf {
        self.dir.join(format!("{code}.v{version}.json"))
    }

    fn scan(&self) -> io::Result<Vec<Language>> {
        let mut found: BTreeMap<String, Vec<u32>> = BTreeMap::new();
        for entry in std::fs::read_dir(&self.dir)? {
            let name = entry?.file_name();
            if let Some((code, version)) = name.to_str().and_then(parse_file_name) {
                found.entry(code.to_string()).or_default().push(version);
            }
        }
        Ok(found
            .into_iter()
            .map(|(code, mut numbers)| {
                numbers.sort_unstable();
                let name = self.names.get(&code).cloned().unwrap_or_else(|| code.clone());
                let mut language = Language::new(code, name);
                language.editing_language = language.code == self.editing;
                language.versions = numbers.into_iter().map(Version::new).collect();
                language
            })
            .collect())
    }

    pub fn latest_version(&self, code: &str) -> io::Result<Option<u32>> {
        Ok(self
            .scan()?
            .into_iter()
            .find(|l| l.code == code)
            .and_then(|l| l.versions.iter().map(|v| v.number).max()))
    }
}

/// `en.v3.json` -> `("en", 3)`.
fn parse_file_name(name: &str) -> Option<(&str, u32)> {
    let stem = name.strip_suffix(".json")?;
    let (code, version) = stem.rsplit_once(".v")?;
    if code.is_empty() {
        return None;
    }
    Some((code, version.parse().ok()?))
}

fn backend(e: io::Error) -> StorageError {
    StorageError::Backend(e.to_string())
}

impl SubtitleStorage for DirStorage {
    fn get_languages(&self, callback: StorageCallback<Vec<Language>>) {
        callback(self.scan().map_err(backend));
    }

    fn get_subtitles(&self, language_code: &str, version: u32, callback: StorageCallback<String>) {
        let path = self.path(language_code, version);
        let result = std::fs::read_to_string(&path).map_err(|e| match e.kind() {
            io::ErrorKind::NotFound => StorageError::VersionNotFound {
                language_code: language_code.to_string(),
                version,
            },
            _ => backend(e),
        });
        callback(result);
    }

    fn save_subtitles(
        &self,
        video_id: &str,
        language_code: &str,
        document: String,
        callback: StorageCallback<()>,
    ) {
        let result = self.latest_version(language_code).and_then(|latest| {
            let version = latest.unwrap_or(0) + 1;
            let path = self.path(language_code, version);
            log::info!("saving {video_id} {language_code} v{version} to {}", path.display());
            std::fs::write(path, document)
        });
        callback(result.map_err(backend));
    }
}
