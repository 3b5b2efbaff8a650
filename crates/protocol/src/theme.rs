use serde::{Deserialize, Serialize};

/// Semantic color tokens resolved by the renderer's active theme.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ThemeToken {
    Background,
    Surface,
    Border,

    TextPrimary,
    TextSecondary,
    TextMuted,

    // Ruler
    RulerBackground,
    TickLine,
    TickLabel,

    // Subtitle bands
    BandFill,
    BandBorder,
    BandText,
    BandHandle,
    BandDragging,

    SelectionHighlight,
}
