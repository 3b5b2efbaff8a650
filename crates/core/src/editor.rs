use std::rc::Rc;

use subline_protocol::RenderCommand;

use crate::clock::PlaybackClock;
use crate::config::TimelineConfig;
use crate::controllers::{
    ListError, ReferenceSelector, SaveSessionButton, SubtitleItemEditor, SubtitleListController,
};
use crate::events::{EventBus, ListName};
use crate::model::DocumentParser;
use crate::storage::SubtitleStorage;
use crate::svg::{Layer, render_layers};
use crate::timeline::{DragCommit, Timeline};

/// Everything a frontend talks to.
///
/// Owns the bus and every component on it. Input goes in through the clock,
/// the pointer methods and the list operations; [`Editor::pump`] then lets
/// each component catch up, after which the render command accessors return
/// the current frame.
pub struct Editor {
    bus: EventBus,
    clock: PlaybackClock,
    working: SubtitleListController,
    reference: SubtitleListController,
    selector: ReferenceSelector,
    save_button: SaveSessionButton,
    timeline: Timeline,
    row_editor: Option<SubtitleItemEditor>,
}

impl Editor {
    pub fn new(
        storage: Rc<dyn SubtitleStorage>,
        parser: Rc<dyn DocumentParser>,
        config: TimelineConfig,
    ) -> Self {
        let bus = EventBus::new();
        let timeline = Timeline::with_config(&bus, config.clone());
        Self {
            clock: PlaybackClock::new(&bus, config.scale),
            working: SubtitleListController::new(
                ListName::Working,
                Rc::clone(&storage),
                Rc::clone(&parser),
                &bus,
            ),
            reference: SubtitleListController::new(
                ListName::Reference,
                Rc::clone(&storage),
                parser,
                &bus,
            ),
            selector: ReferenceSelector::new(storage),
            save_button: SaveSessionButton::new(&bus),
            timeline,
            row_editor: None,
            bus,
        }
    }

    pub fn bus(&self) -> &EventBus {
        &self.bus
    }

    pub fn clock(&self) -> &PlaybackClock {
        &self.clock
    }

    pub fn clock_mut(&mut self) -> &mut PlaybackClock {
        &mut self.clock
    }

    pub fn working(&self) -> &SubtitleListController {
        &self.working
    }

    pub fn working_mut(&mut self) -> &mut SubtitleListController {
        &mut self.working
    }

    pub fn reference(&self) -> &SubtitleListController {
        &self.reference
    }

    pub fn selector(&self) -> &ReferenceSelector {
        &self.selector
    }

    pub fn timeline(&self) -> &Timeline {
        &self.timeline
    }

    pub fn can_save(&self) -> bool {
        self.save_button.can_save()
    }

    /// Load the subtitles to edit. A row still open for editing is dropped
    /// along with the document it belonged to.
    pub fn load_working(&mut self, video_id: &str, language_code: &str, version: u32) {
        self.row_editor = None;
        self.working.set_video_id(video_id);
        self.working.set_language_code(language_code);
        self.working.get_subtitles(Some(language_code), Some(version));
    }

    /// Fetch the reference languages; the editing language's newest version
    /// is loaded into the reference list.
    pub fn load_reference_languages(&mut self) {
        self.selector.load_languages(&mut self.reference);
    }

    pub fn select_reference_language(&mut self, code: &str) {
        self.selector
            .language_select_changed(Some(code), &mut self.reference);
    }

    pub fn select_reference_version(&mut self, number: u32) {
        self.selector.select_version(number, &mut self.reference);
    }

    /// Let every component process what happened since the last call.
    /// Returns true if anything changed.
    pub fn pump(&mut self) -> bool {
        let mut changed = self.working.pump();
        changed |= self.reference.pump();
        changed |= self.selector.pump(&mut self.reference);
        changed |= self.timeline.pump(self.working.collection());
        changed |= self.save_button.pump();
        changed
    }

    pub fn ruler_commands(&self) -> &[RenderCommand] {
        self.timeline.ruler_commands()
    }

    pub fn band_commands(&self) -> Vec<RenderCommand> {
        self.timeline.band_commands()
    }

    /// The ruler with the band strip below it, as one SVG document.
    pub fn timeline_svg(&self, dark: bool) -> String {
        let bands = self.band_commands();
        let ruler_height = self.timeline.config().ruler_height;
        render_layers(
            &[
                Layer {
                    y: 0.0,
                    commands: self.ruler_commands(),
                },
                Layer {
                    y: ruler_height,
                    commands: &bands,
                },
            ],
            self.clock.viewport_width(),
            ruler_height + self.timeline.band_strip_height(),
            dark,
        )
    }

    pub fn pointer_down(&mut self, x: f64, y: f64) -> bool {
        self.timeline.pointer_down(x, y, self.working.collection())
    }

    pub fn pointer_move(&mut self, x: f64) -> bool {
        self.timeline.pointer_move(x)
    }

    /// Release the pointer. A finished drag is committed to the working
    /// subtitles and their document.
    pub fn pointer_up(&mut self) -> Result<Option<DragCommit>, ListError> {
        let commit = self.timeline.pointer_up(self.working.collection_mut())?;
        if commit.is_some() {
            self.working.sync_times()?;
        }
        Ok(commit)
    }

    pub fn pointer_leave(&mut self) -> bool {
        self.timeline.pointer_leave(self.working.collection())
    }

    /// Open a working row for editing. Returns its raw markup.
    pub fn start_editing(&mut self, index: usize) -> Result<String, ListError> {
        let mut row = SubtitleItemEditor::new(index, &self.bus);
        let content = row.start_editing(&self.working)?;
        self.working.set_selected_index(Some(index));
        self.row_editor = Some(row);
        Ok(content)
    }

    pub fn editing_index(&self) -> Option<usize> {
        let row = self.row_editor.as_ref()?;
        row.row_in(&self.working).ok()
    }

    pub fn text_changed(&mut self, new_text: &str) -> Result<(), ListError> {
        let row = self.row_editor.as_ref().ok_or(ListError::NotEditing)?;
        row.text_changed(&mut self.working, new_text)
    }

    /// Close the row being edited, storing `new_value`. Returns whether the
    /// text changed.
    pub fn finish_editing(&mut self, new_value: &str) -> Result<bool, ListError> {
        let mut row = self.row_editor.take().ok_or(ListError::NotEditing)?;
        row.finish_editing(&mut self.working, new_value)
    }

    pub fn save_session(&mut self) -> Result<(), ListError> {
        self.save_button.save_session(&mut self.working)
    }
}

impl std::fmt::Debug for Editor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Editor")
            .field("working", &self.working)
            .field("reference", &self.reference)
            .field("selector", &self.selector)
            .field("can_save", &self.can_save())
            .finish_non_exhaustive()
    }
}
