use serde::{Deserialize, Serialize};

use crate::shared_str::SharedStr;
use crate::theme::ThemeToken;
use crate::types::{Point, Rect};

/// A single, stateless render instruction.
///
/// The core emits a `Vec<RenderCommand>` for the tick ruler and for the
/// subtitle bands. Renderers consume this list sequentially; each command
/// carries all the data it needs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum RenderCommand {
    /// Wipe a region back to the surface background before redrawing it.
    ClearRect { rect: Rect },

    /// Draw a filled rectangle, optionally with a text label and the id of
    /// the subtitle it belongs to (for hit-testing).
    DrawRect {
        rect: Rect,
        color: ThemeToken,
        border_color: Option<ThemeToken>,
        label: Option<SharedStr>,
        subtitle_id: Option<u64>,
    },

    /// Draw a text string. `position.y` is the text baseline.
    DrawText {
        position: Point,
        text: SharedStr,
        color: ThemeToken,
        font_size: f64,
        bold: bool,
        align: TextAlign,
    },

    /// Draw a line segment.
    DrawLine {
        from: Point,
        to: Point,
        color: ThemeToken,
        width: f64,
    },

    /// Restrict subsequent drawing to a rectangular region.
    SetClip { rect: Rect },

    /// Remove the active clip region.
    ClearClip,

    /// Begin a logical group (the ruler, one band). Renderers may use this
    /// for batching or layer separation.
    BeginGroup {
        id: SharedStr,
        label: Option<SharedStr>,
    },

    /// End the current group.
    EndGroup,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TextAlign {
    Left,
    Center,
    Right,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn commands_serialize_as_tagged_json() {
        let cmd = RenderCommand::DrawLine {
            from: Point::new(10.5, 60.0),
            to: Point::new(10.5, 45.0),
            color: ThemeToken::TickLine,
            width: 1.0,
        };
        let json = serde_json::to_string(&cmd).unwrap_or_default();
        assert!(json.starts_with("{\"DrawLine\""), "json={json}");

        let back: Option<RenderCommand> = serde_json::from_str(&json).ok();
        assert_eq!(back, Some(cmd));
    }

    #[test]
    fn text_alignment_is_a_plain_string() {
        let json = serde_json::to_string(&TextAlign::Center).unwrap_or_default();
        assert_eq!(json, "\"Center\"");
    }
}
