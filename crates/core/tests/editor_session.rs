//! Integration test: load a working and a reference document into an Editor,
//! retime subtitles by dragging their bands, and save the session.

use std::rc::Rc;

use subline_core::Editor;
use subline_core::TimelineConfig;
use subline_core::controllers::ListStatus;
use subline_core::model::{JsonDocument, JsonDocumentParser, SubtitleCollection, SubtitleId};
use subline_core::storage::MemoryStorage;
use subline_protocol::RenderCommand;

const EN: &str = include_str!("fixtures/interview-en.json");
const FR: &str = include_str!("fixtures/interview-fr.json");

fn storage() -> Rc<MemoryStorage> {
    let storage = Rc::new(MemoryStorage::new());
    storage.add_language("en", "English", true);
    storage.add_version("en", 1, EN);
    storage.add_version("en", 2, EN);
    storage.add_language("fr", "French", false);
    storage.add_version("fr", 1, FR);
    storage
}

fn open_session(storage: &Rc<MemoryStorage>) -> Editor {
    let mut editor = Editor::new(
        storage.clone(),
        Rc::new(JsonDocumentParser),
        TimelineConfig::default(),
    );
    editor.clock_mut().set_duration(20.0);
    editor.clock_mut().set_viewport_width(600.0);
    editor.load_working("interview", "en", 1);
    editor.load_reference_languages();
    editor.pump();
    editor
}

fn times(editor: &Editor, id: u64) -> Option<(f64, f64)> {
    editor
        .working()
        .collection()
        .and_then(|c| c.subtitle(SubtitleId(id)))
        .map(|s| (s.start_time, s.end_time))
}

#[test]
fn loads_working_and_reference_sets() {
    let storage = storage();
    let mut editor = open_session(&storage);

    assert_eq!(editor.working().status(), &ListStatus::Ready);
    assert_eq!(editor.working().items().len(), 6);
    assert_eq!(editor.working().items()[1].text, "Of course, <i>happy</i> to be here.");

    // The reference side follows the editing language's newest version.
    assert_eq!(editor.selector().version(), Some(2));
    assert_eq!(editor.reference().items().len(), 6);

    editor.select_reference_language("fr");
    assert_eq!(editor.reference().items().len(), 3);
    assert_eq!(
        editor.reference().items()[2].text,
        "Commençons par les <b>premières</b> années."
    );

    // 0..6 s visible: the first three cues.
    assert_eq!(editor.timeline().window().start_time, 0.0);
    assert_eq!(editor.timeline().bands().len(), 3);
}

#[test]
fn drag_leave_then_drag_release_retimes_once() {
    let storage = storage();
    let mut editor = open_session(&storage);
    let before = times(&editor, 1);
    assert_eq!(before, Some((2_600.0, 4_800.0)));

    // Body of the second band spans x 268..472.
    assert!(editor.pointer_down(300.0, 20.0));
    assert!(editor.pointer_move(350.0));
    assert!(editor.pointer_leave());
    assert_eq!(times(&editor, 1), before);
    editor.pump();
    assert!(!editor.can_save());

    assert!(editor.pointer_down(300.0, 20.0));
    for x in [320.0, 340.0, 290.0, 350.0] {
        editor.pointer_move(x);
    }
    let commit = editor.pointer_up().expect("commit failed");
    assert_eq!(commit.map(|c| c.subtitle), Some(SubtitleId(1)));
    assert_eq!(times(&editor, 1), Some((3_100.0, 5_300.0)));
    assert_eq!(editor.working().items()[1].start_time, 3_100.0);

    editor.pump();
    assert!(editor.can_save());
}

#[test]
fn right_handle_moves_end_and_session_saves() {
    let storage = storage();
    let mut editor = open_session(&storage);

    // First band: x 50, width 170; right handle 212..220.
    assert!(editor.pointer_down(215.0, 20.0));
    editor.pointer_move(225.0);
    editor.pointer_up().expect("commit failed");
    assert_eq!(times(&editor, 0), Some((500.0, 2_300.0)));

    editor.pump();
    editor.save_session().expect("save failed");
    editor.pump();
    assert!(!editor.can_save());
    assert_eq!(editor.working().status(), &ListStatus::Ready);

    let saved = storage.saved();
    assert_eq!(saved.len(), 1);
    assert_eq!(saved[0].video_id, "interview");
    assert_eq!(saved[0].language_code, "en");
    let doc = JsonDocument::from_json(&saved[0].document).expect("saved document parses");
    assert_eq!(doc.language.as_deref(), Some("en"));
    assert_eq!(doc.subtitles[0].end, 2_300.0);
    assert_eq!(doc.subtitles[1].start, 2_600.0);
}

#[test]
fn scrolling_replaces_bands_and_ruler() {
    let storage = storage();
    let mut editor = open_session(&storage);

    editor.clock_mut().set_current_time(15.0);
    assert!(editor.pump());
    assert_eq!(editor.timeline().window().start_time, 12.0);
    assert_eq!(editor.timeline().bands().len(), 2);

    let labels: Vec<String> = editor
        .ruler_commands()
        .iter()
        .filter_map(|c| match c {
            RenderCommand::DrawText { text, .. } => Some(text.to_string()),
            _ => None,
        })
        .collect();
    assert_eq!(labels, vec!["12", "13", "14", "15", "16", "17"]);

    let svg = editor.timeline_svg(true);
    assert!(svg.contains("Every summer we sailed &amp; fished."));
}

#[test]
fn editing_a_row_updates_band_label() {
    let storage = storage();
    let mut editor = open_session(&storage);

    let raw = editor.start_editing(4).expect("row exists");
    assert_eq!(raw, "Tell me more.");
    editor.text_changed("Tell me").expect("row exists");
    assert!(editor.finish_editing("Tell me *everything*.").expect("edit applies"));

    editor.clock_mut().set_current_time(12.0);
    editor.pump();
    let labelled = editor.band_commands().iter().any(|c| {
        matches!(c, RenderCommand::DrawRect { label: Some(l), .. } if l.as_str() == "Tell me everything.")
    });
    assert!(labelled);
    assert!(editor.can_save());
}
