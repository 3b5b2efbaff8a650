use std::cell::RefCell;
use std::collections::VecDeque;
use std::rc::Rc;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::events::{EditorEvent, EventBus, ListName};
use crate::model::{
    CollectionError, DocumentError, DocumentParser, SubtitleCollection, SubtitleDocument,
    SubtitleId, SubtitleList,
};
use crate::storage::{StorageError, SubtitleStorage};

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ListStatus {
    /// Nothing requested, or nothing to request.
    #[default]
    Idle,
    Loading,
    Ready,
    Saving,
    /// The last fetch or save failed.
    Failed(String),
}

/// One row of the list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubtitleItem {
    pub id: SubtitleId,
    /// Position of the node in the document.
    pub index: usize,
    pub start_time: f64,
    pub end_time: f64,
    /// Rendered text.
    pub text: String,
}

#[derive(Debug, Error)]
pub enum ListError {
    #[error("no subtitles loaded")]
    NotLoaded,
    #[error("no video id set")]
    MissingVideoId,
    #[error("no language code set")]
    MissingLanguage,
    #[error("no subtitle at row {0}")]
    NoSuchRow(usize),
    #[error("no row is being edited")]
    NotEditing,
    #[error(transparent)]
    Document(#[from] DocumentError),
    #[error(transparent)]
    Collection(#[from] CollectionError),
}

enum Completion {
    Fetched(Result<String, StorageError>),
    Saved(Result<(), StorageError>),
}

type Inbox = Rc<RefCell<VecDeque<Completion>>>;

/// Everything that touches one list of subtitles as a group: loading it,
/// adding and removing rows, and saving it back.
///
/// The parsed document is the source of truth for content. Rows and the
/// timeline's [`SubtitleList`] are derived from it on load and kept in step
/// by every edit made through this controller.
pub struct SubtitleListController {
    name: ListName,
    storage: Rc<dyn SubtitleStorage>,
    parser: Rc<dyn DocumentParser>,
    bus: EventBus,
    status: ListStatus,
    document: Option<Box<dyn SubtitleDocument>>,
    collection: Option<SubtitleList>,
    items: Vec<SubtitleItem>,
    selected_index: Option<usize>,
    video_id: Option<String>,
    language_code: Option<String>,
    inbox: Inbox,
}

impl SubtitleListController {
    pub fn new(
        name: ListName,
        storage: Rc<dyn SubtitleStorage>,
        parser: Rc<dyn DocumentParser>,
        bus: &EventBus,
    ) -> Self {
        Self {
            name,
            storage,
            parser,
            bus: bus.clone(),
            status: ListStatus::Idle,
            document: None,
            collection: None,
            items: Vec::new(),
            selected_index: None,
            video_id: None,
            language_code: None,
            inbox: Rc::default(),
        }
    }

    pub fn name(&self) -> ListName {
        self.name
    }

    pub fn status(&self) -> &ListStatus {
        &self.status
    }

    pub fn items(&self) -> &[SubtitleItem] {
        &self.items
    }

    pub fn item(&self, index: usize) -> Option<&SubtitleItem> {
        self.items.get(index)
    }

    pub fn collection(&self) -> Option<&SubtitleList> {
        self.collection.as_ref()
    }

    pub fn collection_mut(&mut self) -> Option<&mut SubtitleList> {
        self.collection.as_mut()
    }

    pub fn is_loaded(&self) -> bool {
        self.document.is_some()
    }

    pub fn selected_index(&self) -> Option<usize> {
        self.selected_index
    }

    pub fn set_selected_index(&mut self, index: Option<usize>) {
        self.selected_index = index;
    }

    pub fn video_id(&self) -> Option<&str> {
        self.video_id.as_deref()
    }

    pub fn set_video_id(&mut self, video_id: impl Into<String>) {
        self.video_id = Some(video_id.into());
    }

    pub fn language_code(&self) -> Option<&str> {
        self.language_code.as_deref()
    }

    pub fn set_language_code(&mut self, language_code: impl Into<String>) {
        self.language_code = Some(language_code.into());
    }

    /// Request one version of a language from storage.
    ///
    /// With no language or no version there is nothing to show yet (a
    /// translation without a source, say) and the list goes idle.
    pub fn get_subtitles(&mut self, language_code: Option<&str>, version: Option<u32>) {
        let (Some(code), Some(version)) = (language_code, version) else {
            self.status = ListStatus::Idle;
            return;
        };
        log::info!("{:?} list: fetching {code} v{version}", self.name);
        self.status = ListStatus::Loading;
        let inbox = Rc::clone(&self.inbox);
        self.storage.get_subtitles(
            code,
            version,
            Box::new(move |result| inbox.borrow_mut().push_back(Completion::Fetched(result))),
        );
        self.pump();
    }

    /// Apply storage completions that arrived since the last call.
    pub fn pump(&mut self) -> bool {
        let completions: Vec<_> = self.inbox.borrow_mut().drain(..).collect();
        let changed = !completions.is_empty();
        for completion in completions {
            match completion {
                Completion::Fetched(Ok(raw)) => {
                    if let Err(err) = self.on_subtitles_fetched(&raw) {
                        log::debug!("{:?} list: fetched document not loaded: {err}", self.name);
                    }
                }
                Completion::Fetched(Err(err)) => self.fetch_failed(&err),
                Completion::Saved(Ok(())) => {
                    log::info!("{:?} list: saved", self.name);
                    self.status = ListStatus::Ready;
                    self.bus.publish(EditorEvent::Saved);
                }
                Completion::Saved(Err(err)) => {
                    log::warn!("{:?} list: save failed: {err}", self.name);
                    self.status = ListStatus::Failed(err.to_string());
                }
            }
        }
        changed
    }

    /// Load a raw document: parse it, rebuild rows and collection, and let
    /// the other components know.
    pub fn on_subtitles_fetched(&mut self, raw: &str) -> Result<(), ListError> {
        let document = match self.parser.parse(raw) {
            Ok(document) => document,
            Err(err) => {
                log::warn!("{:?} list: unreadable document: {err}", self.name);
                self.status = ListStatus::Failed(err.to_string());
                return Err(err.into());
            }
        };

        let mut collection = SubtitleList::new();
        let mut items = Vec::with_capacity(document.len());
        for index in 0..document.len() {
            let start_time = document.start_time(index).unwrap_or_default();
            let end_time = document.end_time(index).unwrap_or_default();
            let text = document.content_rendered(index).unwrap_or_default();
            let id = collection.push(start_time, end_time, text.clone());
            items.push(SubtitleItem {
                id,
                index,
                start_time,
                end_time,
                text,
            });
        }

        log::info!("{:?} list: {} subtitles loaded", self.name, items.len());
        self.document = Some(document);
        self.collection = Some(collection);
        self.items = items;
        self.selected_index = None;
        self.status = ListStatus::Ready;
        self.bus.publish(EditorEvent::SubtitlesFetched(self.name));
        Ok(())
    }

    /// Record a fetch that could not be served. Rows of a previously loaded
    /// document are dropped so they are not taken for the requested version.
    pub fn fetch_failed(&mut self, err: &StorageError) {
        log::warn!("{:?} list: fetch failed: {err}", self.name);
        self.document = None;
        self.collection = None;
        self.items.clear();
        self.selected_index = None;
        self.status = ListStatus::Failed(err.to_string());
    }

    /// Raw markup of one row, as the user edits it.
    pub fn content(&self, index: usize) -> Option<&str> {
        self.document.as_ref()?.content(index)
    }

    /// Write new markup into one row. Returns the new rendered text.
    pub fn set_content(&mut self, index: usize, content: &str) -> Result<String, ListError> {
        let document = self.document.as_mut().ok_or(ListError::NotLoaded)?;
        document.set_content(index, content)?;
        let rendered = document.content_rendered(index).unwrap_or_default();
        self.set_item_text(index, &rendered)?;
        Ok(rendered)
    }

    /// Replace the displayed text of one row.
    pub fn set_item_text(&mut self, index: usize, text: &str) -> Result<(), ListError> {
        let item = self.items.get_mut(index).ok_or(ListError::NoSuchRow(index))?;
        item.text = text.to_string();
        if let Some(collection) = self.collection.as_mut() {
            collection.set_text(item.id, text)?;
        }
        Ok(())
    }

    /// Copy timing edits made through the collection into rows and document.
    pub fn sync_times(&mut self) -> Result<(), ListError> {
        let (Some(document), Some(collection)) = (self.document.as_mut(), self.collection.as_ref())
        else {
            return Err(ListError::NotLoaded);
        };
        for item in &mut self.items {
            let Some(subtitle) = collection.subtitle(item.id) else {
                continue;
            };
            if subtitle.start_time != item.start_time || subtitle.end_time != item.end_time {
                item.start_time = subtitle.start_time;
                item.end_time = subtitle.end_time;
                document.set_times(item.index, item.start_time, item.end_time)?;
            }
        }
        Ok(())
    }

    /// Serialize the document and hand it to storage.
    pub fn save_subtitles(&mut self) -> Result<(), ListError> {
        let video_id = self.video_id.clone().ok_or(ListError::MissingVideoId)?;
        let language_code = self.language_code.clone().ok_or(ListError::MissingLanguage)?;
        self.sync_times()?;
        let document = self.document.as_ref().ok_or(ListError::NotLoaded)?.serialize()?;

        log::info!("{:?} list: saving {language_code} for video {video_id}", self.name);
        self.status = ListStatus::Saving;
        let inbox = Rc::clone(&self.inbox);
        self.storage.save_subtitles(
            &video_id,
            &language_code,
            document,
            Box::new(move |result| inbox.borrow_mut().push_back(Completion::Saved(result))),
        );
        self.pump();
        Ok(())
    }

    /// Insert a row at `index`.
    ///
    /// # Panics
    ///
    /// If `item.index` is not `index`. Callers build the item for the slot
    /// they insert it into, so a mismatch is a bug on their side.
    pub fn add_subtitle(&mut self, item: SubtitleItem, index: usize) -> Result<SubtitleId, ListError> {
        assert_eq!(item.index, index, "indexes don't match");
        let (Some(document), Some(collection)) = (self.document.as_mut(), self.collection.as_mut())
        else {
            return Err(ListError::NotLoaded);
        };

        document.insert(index, item.start_time, item.end_time, &item.text)?;
        let text = document.content_rendered(index).unwrap_or_default();
        let id = collection.insert(index, item.start_time, item.end_time, text.clone());
        self.items.insert(
            index,
            SubtitleItem {
                id,
                text,
                ..item
            },
        );
        self.reindex();
        self.bus.publish(EditorEvent::WorkDone { subtitle: Some(id) });
        Ok(id)
    }

    /// Remove the row at `index`.
    pub fn remove_subtitle(&mut self, index: usize) -> Result<SubtitleItem, ListError> {
        if index >= self.items.len() {
            return Err(ListError::NoSuchRow(index));
        }
        let document = self.document.as_mut().ok_or(ListError::NotLoaded)?;
        document.remove(index)?;
        let item = self.items.remove(index);
        if let Some(collection) = self.collection.as_mut() {
            collection.remove(item.id);
        }
        self.reindex();
        if self.selected_index == Some(index) {
            self.selected_index = None;
        }
        self.bus.publish(EditorEvent::WorkDone {
            subtitle: Some(item.id),
        });
        Ok(item)
    }

    fn reindex(&mut self) {
        for (index, item) in self.items.iter_mut().enumerate() {
            item.index = index;
        }
    }
}

impl std::fmt::Debug for SubtitleListController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SubtitleListController")
            .field("name", &self.name)
            .field("status", &self.status)
            .field("items", &self.items.len())
            .field("video_id", &self.video_id)
            .field("language_code", &self.language_code)
            .finish()
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::events::Topic;
    use crate::model::JsonDocumentParser;
    use crate::storage::MemoryStorage;

    pub(crate) const DOC: &str = r#"{
        "language": "en",
        "subtitles": [
            { "start": 0, "end": 1500, "content": "Hello *there*" },
            { "start": 2000, "end": 4000, "content": "**Second** line" },
            { "start": 5000, "end": 6500, "content": "Third" }
        ]
    }"#;

    pub(crate) fn storage() -> Rc<MemoryStorage> {
        let storage = Rc::new(MemoryStorage::new());
        storage.add_language("en", "English", true);
        storage.add_version("en", 1, DOC);
        storage
    }

    fn controller(storage: Rc<MemoryStorage>, bus: &EventBus) -> SubtitleListController {
        SubtitleListController::new(
            ListName::Working,
            storage,
            Rc::new(JsonDocumentParser),
            bus,
        )
    }

    #[test]
    fn missing_language_or_version_goes_idle() {
        let bus = EventBus::new();
        let mut list = controller(storage(), &bus);
        list.get_subtitles(Some("en"), None);
        assert_eq!(list.status(), &ListStatus::Idle);
        list.get_subtitles(None, Some(1));
        assert_eq!(list.status(), &ListStatus::Idle);
        assert!(!list.is_loaded());
    }

    #[test]
    fn fetch_builds_rows_and_collection() {
        let bus = EventBus::new();
        let docs = bus.subscribe(&[Topic::Document]);
        let mut list = controller(storage(), &bus);
        list.get_subtitles(Some("en"), Some(1));

        assert_eq!(list.status(), &ListStatus::Ready);
        assert_eq!(list.items().len(), 3);
        let second = &list.items()[1];
        assert_eq!(second.index, 1);
        assert_eq!((second.start_time, second.end_time), (2_000.0, 4_000.0));
        assert_eq!(second.text, "<b>Second</b> line");
        assert_eq!(list.items()[0].text, "Hello <i>there</i>");

        let visible = list
            .collection()
            .map(|c| c.subtitles_for_time(0.0, 3_000.0).len());
        assert_eq!(visible, Some(2));
        assert_eq!(
            docs.drain(),
            vec![EditorEvent::SubtitlesFetched(ListName::Working)]
        );
    }

    #[test]
    fn fetch_failure_is_reported_in_status() {
        let bus = EventBus::new();
        let mut list = controller(storage(), &bus);
        list.get_subtitles(Some("en"), Some(9));
        assert!(matches!(list.status(), ListStatus::Failed(_)));
        assert!(!list.is_loaded());
    }

    #[test]
    fn failed_refetch_drops_previous_rows() {
        let bus = EventBus::new();
        let mut list = controller(storage(), &bus);
        list.get_subtitles(Some("en"), Some(1));
        assert_eq!(list.items().len(), 3);

        list.get_subtitles(Some("en"), Some(2));
        assert!(matches!(list.status(), ListStatus::Failed(reason) if reason.contains("version 2")));
        assert!(list.items().is_empty());
        assert!(list.collection().is_none());
        assert!(!list.is_loaded());
    }

    #[test]
    fn unparsable_document_fails() {
        let bus = EventBus::new();
        let mut list = controller(storage(), &bus);
        assert!(list.on_subtitles_fetched("<tt/>").is_err());
        assert!(matches!(list.status(), ListStatus::Failed(_)));
    }

    #[test]
    fn save_requires_video_and_language() {
        let bus = EventBus::new();
        let mut list = controller(storage(), &bus);
        list.get_subtitles(Some("en"), Some(1));
        assert!(matches!(list.save_subtitles(), Err(ListError::MissingVideoId)));
        list.set_video_id("vid");
        assert!(matches!(list.save_subtitles(), Err(ListError::MissingLanguage)));
    }

    #[test]
    fn save_writes_timing_edits_and_returns_to_ready() {
        let bus = EventBus::new();
        let saved = bus.subscribe(&[Topic::Storage]);
        let storage = storage();
        let mut list = controller(Rc::clone(&storage), &bus);
        list.get_subtitles(Some("en"), Some(1));
        list.set_video_id("vid");
        list.set_language_code("en");

        let id = list.items()[1].id;
        let updated = list
            .collection_mut()
            .map(|c| c.update_subtitle_time(id, 2_500.0, 4_200.0));
        assert_eq!(updated, Some(Ok(())));
        assert!(list.save_subtitles().is_ok());

        assert_eq!(list.status(), &ListStatus::Ready);
        assert_eq!(list.items()[1].start_time, 2_500.0);
        assert_eq!(saved.drain(), vec![EditorEvent::Saved]);

        let stored = storage.saved();
        assert_eq!(stored.len(), 1);
        assert_eq!(stored[0].video_id, "vid");
        let doc = crate::model::JsonDocument::from_json(&stored[0].document);
        assert_eq!(doc.ok().map(|d| d.subtitles[1].start), Some(2_500.0));
    }

    #[test]
    fn add_and_remove_keep_rows_indexed() {
        let bus = EventBus::new();
        let work = bus.subscribe(&[Topic::Work]);
        let mut list = controller(storage(), &bus);
        list.get_subtitles(Some("en"), Some(1));

        let item = SubtitleItem {
            id: SubtitleId(0),
            index: 1,
            start_time: 1_600.0,
            end_time: 1_900.0,
            text: "*new*".into(),
        };
        let id = list.add_subtitle(item, 1);
        assert!(id.is_ok());
        assert_eq!(list.items().len(), 4);
        assert_eq!(list.items()[1].text, "<i>new</i>");
        assert_eq!(list.content(1), Some("*new*"));
        assert_eq!(
            list.items().iter().map(|i| i.index).collect::<Vec<_>>(),
            vec![0, 1, 2, 3]
        );
        assert_eq!(list.collection().map(|c| c.len()), Some(4));

        let removed = list.remove_subtitle(0);
        assert_eq!(removed.ok().map(|i| i.text), Some("Hello <i>there</i>".to_string()));
        assert_eq!(list.items()[0].index, 0);
        assert_eq!(list.items()[0].text, "<i>new</i>");
        assert_eq!(list.collection().map(|c| c.len()), Some(3));
        assert_eq!(work.drain().len(), 2);

        assert!(matches!(list.remove_subtitle(10), Err(ListError::NoSuchRow(10))));
    }

    #[test]
    #[should_panic(expected = "indexes don't match")]
    fn add_with_mismatched_index_panics() {
        let bus = EventBus::new();
        let mut list = controller(storage(), &bus);
        list.get_subtitles(Some("en"), Some(1));
        let item = SubtitleItem {
            id: SubtitleId(0),
            index: 2,
            start_time: 0.0,
            end_time: 1.0,
            text: String::new(),
        };
        let _ = list.add_subtitle(item, 0);
    }

    #[test]
    fn add_before_load_is_an_error() {
        let bus = EventBus::new();
        let mut list = controller(storage(), &bus);
        let item = SubtitleItem {
            id: SubtitleId(0),
            index: 0,
            start_time: 0.0,
            end_time: 1.0,
            text: String::new(),
        };
        assert!(matches!(list.add_subtitle(item, 0), Err(ListError::NotLoaded)));
    }
}
