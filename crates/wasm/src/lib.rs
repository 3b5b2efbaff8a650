use std::cell::RefCell;
use std::rc::Rc;

use serde::Serialize;
use subline_core::controllers::ListError;
use subline_core::model::JsonDocumentParser;
use subline_core::storage::MemoryStorage;
use subline_core::timeline::DragCommit;
use subline_core::{Editor, TimelineConfig};
use thiserror::Error;
use wasm_bindgen::prelude::*;

#[derive(Debug, Error)]
enum BridgeError {
    #[error("editor not initialized; call init() first")]
    NotInitialized,
    #[error("invalid config: {0}")]
    Config(serde_json::Error),
    #[error(transparent)]
    Json(#[from] serde_json::Error),
    #[error(transparent)]
    List(#[from] ListError),
}

/// An editor plus the in-memory storage the host page fills.
struct Session {
    storage: Rc<MemoryStorage>,
    editor: Editor,
}

impl Session {
    fn new(config: TimelineConfig) -> Self {
        let storage = Rc::new(MemoryStorage::new());
        let editor = Editor::new(storage.clone(), Rc::new(JsonDocumentParser), config);
        Self { storage, editor }
    }
}

thread_local! {
    static SESSION: RefCell<Option<Session>> = const { RefCell::new(None) };
}

fn with_session<T>(f: impl FnOnce(&mut Session) -> Result<T, BridgeError>) -> Result<T, BridgeError> {
    SESSION.with(|cell| {
        let mut slot = cell.borrow_mut();
        let session = slot.as_mut().ok_or(BridgeError::NotInitialized)?;
        f(session)
    })
}

fn to_json<T: Serialize + ?Sized>(value: &T) -> Result<String, BridgeError> {
    Ok(serde_json::to_string(value)?)
}

fn js<T>(result: Result<T, BridgeError>) -> Result<T, JsError> {
    result.map_err(|e| JsError::new(&e.to_string()))
}

fn init_session(config_json: Option<&str>) -> Result<(), BridgeError> {
    let config = match config_json {
        Some(raw) => TimelineConfig::from_json(raw).map_err(BridgeError::Config)?,
        None => TimelineConfig::default(),
    };
    SESSION.with(|cell| *cell.borrow_mut() = Some(Session::new(config)));
    Ok(())
}

/// Start a fresh editing session. `config_json` overrides timeline defaults.
#[wasm_bindgen]
pub fn init(config_json: Option<String>) -> Result<(), JsError> {
    js(init_session(config_json.as_deref()))
}

/// Register a subtitle language with the session's storage.
#[wasm_bindgen]
pub fn add_language(code: &str, name: &str, editing: bool) -> Result<(), JsError> {
    js(with_session(|s| {
        s.storage.add_language(code, name, editing);
        Ok(())
    }))
}

/// Add one version's raw document to the session's storage.
#[wasm_bindgen]
pub fn add_version(code: &str, number: u32, document: &str) -> Result<(), JsError> {
    js(with_session(|s| {
        s.storage.add_version(code, number, document);
        Ok(())
    }))
}

/// Load the subtitles to edit and the reference languages.
#[wasm_bindgen]
pub fn load_working(video_id: &str, language_code: &str, version: u32) -> Result<(), JsError> {
    js(with_session(|s| {
        s.editor.load_working(video_id, language_code, version);
        s.editor.load_reference_languages();
        s.editor.pump();
        Ok(())
    }))
}

#[wasm_bindgen]
pub fn set_current_time(seconds: f64) -> Result<(), JsError> {
    js(with_session(|s| {
        s.editor.clock_mut().set_current_time(seconds);
        Ok(())
    }))
}

#[wasm_bindgen]
pub fn set_duration(seconds: f64) -> Result<(), JsError> {
    js(with_session(|s| {
        s.editor.clock_mut().set_duration(seconds);
        Ok(())
    }))
}

#[wasm_bindgen]
pub fn set_scale(scale: f64) -> Result<(), JsError> {
    js(with_session(|s| {
        s.editor.clock_mut().set_scale(scale);
        Ok(())
    }))
}

#[wasm_bindgen]
pub fn resize(width: f64) -> Result<(), JsError> {
    js(with_session(|s| {
        s.editor.clock_mut().set_viewport_width(width);
        Ok(())
    }))
}

/// Let the editor catch up; returns true if the frame changed.
#[wasm_bindgen]
pub fn pump() -> Result<bool, JsError> {
    js(with_session(|s| Ok(s.editor.pump())))
}

/// Ruler render commands as JSON.
#[wasm_bindgen]
pub fn ruler_commands() -> Result<String, JsError> {
    js(with_session(|s| to_json(s.editor.ruler_commands())))
}

/// Band render commands as JSON.
#[wasm_bindgen]
pub fn band_commands() -> Result<String, JsError> {
    js(with_session(|s| to_json(&s.editor.band_commands())))
}

#[wasm_bindgen]
pub fn timeline_svg(dark: bool) -> Result<String, JsError> {
    js(with_session(|s| Ok(s.editor.timeline_svg(dark))))
}

#[wasm_bindgen]
pub fn pointer_down(x: f64, y: f64) -> Result<bool, JsError> {
    js(with_session(|s| Ok(s.editor.pointer_down(x, y))))
}

#[wasm_bindgen]
pub fn pointer_move(x: f64) -> Result<bool, JsError> {
    js(with_session(|s| Ok(s.editor.pointer_move(x))))
}

fn release() -> Result<Option<DragCommit>, BridgeError> {
    with_session(|s| Ok(s.editor.pointer_up()?))
}

/// Finish a drag. Returns the committed times as JSON, or `null`.
#[wasm_bindgen]
pub fn pointer_up() -> Result<String, JsError> {
    js(release().and_then(|commit| to_json(&commit)))
}

#[wasm_bindgen]
pub fn pointer_leave() -> Result<bool, JsError> {
    js(with_session(|s| Ok(s.editor.pointer_leave())))
}

#[wasm_bindgen]
pub fn working_items() -> Result<String, JsError> {
    js(with_session(|s| to_json(s.editor.working().items())))
}

#[wasm_bindgen]
pub fn reference_items() -> Result<String, JsError> {
    js(with_session(|s| to_json(s.editor.reference().items())))
}

#[wasm_bindgen]
pub fn reference_languages() -> Result<String, JsError> {
    js(with_session(|s| to_json(s.editor.selector().languages())))
}

#[wasm_bindgen]
pub fn select_reference_language(code: &str) -> Result<(), JsError> {
    js(with_session(|s| {
        s.editor.select_reference_language(code);
        Ok(())
    }))
}

#[wasm_bindgen]
pub fn select_reference_version(number: u32) -> Result<(), JsError> {
    js(with_session(|s| {
        s.editor.select_reference_version(number);
        Ok(())
    }))
}

/// Open a working row; returns its raw markup.
#[wasm_bindgen]
pub fn start_editing(index: usize) -> Result<String, JsError> {
    js(with_session(|s| Ok(s.editor.start_editing(index)?)))
}

#[wasm_bindgen]
pub fn text_changed(text: &str) -> Result<(), JsError> {
    js(with_session(|s| Ok(s.editor.text_changed(text)?)))
}

#[wasm_bindgen]
pub fn finish_editing(text: &str) -> Result<bool, JsError> {
    js(with_session(|s| Ok(s.editor.finish_editing(text)?)))
}

#[wasm_bindgen]
pub fn can_save() -> Result<bool, JsError> {
    js(with_session(|s| Ok(s.editor.can_save())))
}

#[wasm_bindgen]
pub fn save_session() -> Result<(), JsError> {
    js(with_session(|s| {
        s.editor.save_session()?;
        s.editor.pump();
        Ok(())
    }))
}

/// The most recently saved document, if any.
#[wasm_bindgen]
pub fn last_saved() -> Result<Option<String>, JsError> {
    js(with_session(|s| {
        Ok(s.storage.saved().pop().map(|saved| saved.document))
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    const EN: &str = r#"{ "language": "en", "subtitles": [
        { "start": 500, "end": 2200, "content": "One" },
        { "start": 2600, "end": 4800, "content": "Two *words*" }
    ] }"#;

    fn setup() {
        init_session(None).unwrap();
        with_session(|s| {
            s.storage.add_language("en", "English", true);
            s.storage.add_version("en", 1, EN);
            s.editor.clock_mut().set_duration(10.0);
            s.editor.clock_mut().set_viewport_width(600.0);
            s.editor.load_working("vid", "en", 1);
            s.editor.load_reference_languages();
            s.editor.pump();
            Ok(())
        })
        .unwrap();
    }

    #[test]
    fn uninitialized_session_is_an_error() {
        SESSION.with(|cell| *cell.borrow_mut() = None);
        assert!(matches!(
            with_session(|_| Ok(())),
            Err(BridgeError::NotInitialized)
        ));
    }

    #[test]
    fn bad_config_is_rejected() {
        assert!(matches!(init_session(Some("[1]")), Err(BridgeError::Config(_))));
    }

    #[test]
    fn commands_and_items_serialize() {
        setup();
        let items = with_session(|s| to_json(s.editor.working().items())).unwrap();
        assert!(items.contains(r#""text":"Two <i>words</i>""#));

        let bands = with_session(|s| to_json(&s.editor.band_commands())).unwrap();
        let parsed: serde_json::Value = serde_json::from_str(&bands).unwrap();
        assert!(parsed.as_array().is_some_and(|a| !a.is_empty()));
    }

    #[test]
    fn drag_commit_round_trips_to_json() {
        setup();
        // First band spans x 50..220; grab its body.
        assert!(with_session(|s| Ok(s.editor.pointer_down(100.0, 20.0))).unwrap());
        with_session(|s| Ok(s.editor.pointer_move(150.0))).unwrap();
        let commit = release().and_then(|c| to_json(&c)).unwrap();
        assert!(commit.contains(r#""start_time":1000.0"#));

        let saved = with_session(|s| {
            s.editor.pump();
            s.editor.save_session()?;
            Ok(s.storage.saved().len())
        })
        .unwrap();
        assert_eq!(saved, 1);
    }
}
