//! Headless core of the subline subtitle timing editor.
//!
//! ```text
//!   PlaybackClock ─┐
//!                  ├─▶ EventBus ─▶ Timeline ─▶ TimeWindow ─▶ ruler + bands ─▶ RenderCommand[]
//!   Controllers  ──┘                  ▲
//!                                     └── pointer down/move/up/leave from the frontend
//! ```
//!
//! Frontends own an [`Editor`], feed it pointer and clock input, call
//! [`Editor::pump`] once per frame and draw the commands it hands back.

pub mod clock;
pub mod config;
pub mod controllers;
pub mod editor;
pub mod events;
pub mod model;
pub mod storage;
pub mod svg;
pub mod timeline;

pub use config::TimelineConfig;
pub use editor::Editor;
