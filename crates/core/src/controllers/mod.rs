//! Controllers around the subtitle lists: loading and saving, per-row
//! editing, the reference language picker and the save button.

pub mod item_editor;
pub mod reference_selector;
pub mod save_button;
pub mod subtitle_list;

pub use item_editor::SubtitleItemEditor;
pub use reference_selector::ReferenceSelector;
pub use save_button::SaveSessionButton;
pub use subtitle_list::{ListError, ListStatus, SubtitleItem, SubtitleListController};
