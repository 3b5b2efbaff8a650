use crate::events::{EditorEvent, EventBus};
use crate::model::SubtitleId;

use super::subtitle_list::{ListError, SubtitleListController};

/// Edit state of one row: selecting it for editing, and writing the edited
/// markup back into the document.
///
/// Once editing starts the row is followed by its [`SubtitleId`], so rows
/// added or removed above it meanwhile do not redirect the edit.
#[derive(Debug)]
pub struct SubtitleItemEditor {
    index: usize,
    subtitle: Option<SubtitleId>,
    editing: bool,
    initial_text: Option<String>,
    bus: EventBus,
}

impl SubtitleItemEditor {
    pub fn new(index: usize, bus: &EventBus) -> Self {
        Self {
            index,
            subtitle: None,
            editing: false,
            initial_text: None,
            bus: bus.clone(),
        }
    }

    pub fn index(&self) -> usize {
        self.index
    }

    /// Current row of the subtitle being edited.
    pub fn row_in(&self, list: &SubtitleListController) -> Result<usize, ListError> {
        let Some(id) = self.subtitle else {
            return Ok(self.index);
        };
        list.items()
            .iter()
            .position(|item| item.id == id)
            .ok_or(ListError::NoSuchRow(self.index))
    }

    pub fn is_editing(&self) -> bool {
        self.editing
    }

    /// Enter editing mode. Returns the raw markup to put in the input.
    pub fn start_editing(&mut self, list: &SubtitleListController) -> Result<String, ListError> {
        let item = list.item(self.index).ok_or(ListError::NoSuchRow(self.index))?;
        let content = list
            .content(self.index)
            .ok_or(ListError::NoSuchRow(self.index))?;
        self.subtitle = Some(item.id);
        self.initial_text = Some(item.text.clone());
        self.editing = true;
        Ok(content.to_string())
    }

    /// Leave editing mode, storing `new_value` as the row's markup.
    ///
    /// Returns whether the rendered text changed; only then is the edit
    /// announced as work done.
    pub fn finish_editing(
        &mut self,
        list: &mut SubtitleListController,
        new_value: &str,
    ) -> Result<bool, ListError> {
        self.editing = false;
        self.index = self.row_in(list)?;
        let rendered = list.set_content(self.index, new_value)?;
        let changed = self.initial_text.take().as_deref() != Some(rendered.as_str());
        if changed {
            let id = list.item(self.index).map(|item| item.id);
            log::debug!("row {} edited", self.index);
            self.bus.publish(EditorEvent::WorkDone { subtitle: id });
        }
        Ok(changed)
    }

    /// Live preview while typing. The document is untouched.
    pub fn text_changed(
        &self,
        list: &mut SubtitleListController,
        new_text: &str,
    ) -> Result<(), ListError> {
        let index = self.row_in(list)?;
        list.set_item_text(index, new_text)
    }
}

#[cfg(test)]
mod tests {
    use std::rc::Rc;

    use super::*;
    use crate::controllers::subtitle_list::tests::storage;
    use crate::events::{ListName, Topic};
    use crate::model::JsonDocumentParser;

    fn loaded(bus: &EventBus) -> SubtitleListController {
        let mut list = SubtitleListController::new(
            ListName::Working,
            storage(),
            Rc::new(JsonDocumentParser),
            bus,
        );
        list.get_subtitles(Some("en"), Some(1));
        list
    }

    #[test]
    fn start_editing_returns_raw_markup() {
        let bus = EventBus::new();
        let list = loaded(&bus);
        let mut editor = SubtitleItemEditor::new(0, &bus);
        assert_eq!(editor.start_editing(&list).ok().as_deref(), Some("Hello *there*"));
        assert!(editor.is_editing());
    }

    #[test]
    fn finishing_with_new_text_announces_work() {
        let bus = EventBus::new();
        let work = bus.subscribe(&[Topic::Work]);
        let mut list = loaded(&bus);
        let mut editor = SubtitleItemEditor::new(1, &bus);
        let _ = editor.start_editing(&list);

        assert_eq!(editor.finish_editing(&mut list, "Second *line*").ok(), Some(true));
        assert!(!editor.is_editing());
        assert_eq!(list.items()[1].text, "Second <i>line</i>");
        assert_eq!(list.content(1), Some("Second *line*"));
        let id = list.items()[1].id;
        assert_eq!(
            list.collection().and_then(|c| c.iter().find(|s| s.id == id)).map(|s| s.text.as_str()),
            Some("Second <i>line</i>")
        );
        assert_eq!(
            work.drain(),
            vec![EditorEvent::WorkDone { subtitle: Some(id) }]
        );
    }

    #[test]
    fn finishing_unchanged_is_silent() {
        let bus = EventBus::new();
        let work = bus.subscribe(&[Topic::Work]);
        let mut list = loaded(&bus);
        let mut editor = SubtitleItemEditor::new(0, &bus);
        let raw = editor.start_editing(&list).unwrap_or_default();

        assert_eq!(editor.finish_editing(&mut list, &raw).ok(), Some(false));
        assert!(work.is_empty());
    }

    #[test]
    fn text_changed_updates_row_only() {
        let bus = EventBus::new();
        let mut list = loaded(&bus);
        let editor = SubtitleItemEditor::new(2, &bus);
        assert!(editor.text_changed(&mut list, "Thi").is_ok());
        assert_eq!(list.items()[2].text, "Thi");
        assert_eq!(list.content(2), Some("Third"));
    }

    #[test]
    fn edit_follows_its_row_when_rows_above_are_removed() {
        let bus = EventBus::new();
        let mut list = loaded(&bus);
        let mut editor = SubtitleItemEditor::new(1, &bus);
        let _ = editor.start_editing(&list);

        assert!(list.remove_subtitle(0).is_ok());
        assert_eq!(editor.row_in(&list).ok(), Some(0));
        assert!(editor.text_changed(&mut list, "Secon").is_ok());
        assert_eq!(list.items()[0].text, "Secon");

        assert_eq!(editor.finish_editing(&mut list, "Second *row*").ok(), Some(true));
        assert_eq!(editor.index(), 0);
        assert_eq!(list.content(0), Some("Second *row*"));
        assert_eq!(list.content(1), Some("Third"));
    }

    #[test]
    fn finishing_a_removed_row_is_an_error() {
        let bus = EventBus::new();
        let mut list = loaded(&bus);
        let mut editor = SubtitleItemEditor::new(1, &bus);
        let _ = editor.start_editing(&list);

        assert!(list.remove_subtitle(1).is_ok());
        assert!(matches!(
            editor.finish_editing(&mut list, "gone"),
            Err(ListError::NoSuchRow(1))
        ));
        assert_eq!(list.content(1), Some("Third"));
    }

    #[test]
    fn unknown_row_is_an_error() {
        let bus = EventBus::new();
        let list = loaded(&bus);
        let mut editor = SubtitleItemEditor::new(42, &bus);
        assert!(matches!(editor.start_editing(&list), Err(ListError::NoSuchRow(42))));
    }
}
