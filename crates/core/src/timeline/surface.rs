use std::collections::BTreeMap;

use subline_protocol::{Rect, RenderCommand, SharedStr, ThemeToken};

use super::bands::{BandSurface, DragRegion, band_regions};
use super::window::BandPlacement;
use crate::config::TimelineConfig;
use crate::model::{Subtitle, SubtitleId};

/// Identity of one retained band element.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ElementId(u64);

#[derive(Debug, Clone)]
struct BandElement {
    subtitle: SubtitleId,
    label: SharedStr,
    placement: Option<BandPlacement>,
    dragging: bool,
}

/// Retained band elements, emitted as render commands.
///
/// This is the surface every bundled frontend uses: it keeps one element per
/// handle, answers hit tests from the last placement, and turns the whole
/// set into a command list each frame.
#[derive(Debug, Clone)]
pub struct CommandSurface {
    elements: BTreeMap<ElementId, BandElement>,
    next_id: u64,
    band_top: f64,
    band_height: f64,
    handle_width: f64,
}

impl CommandSurface {
    pub fn new(config: &TimelineConfig) -> Self {
        Self {
            elements: BTreeMap::new(),
            next_id: 0,
            band_top: config.band_top,
            band_height: config.band_height,
            handle_width: config.handle_width,
        }
    }

    pub fn len(&self) -> usize {
        self.elements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }

    pub fn placement(&self, element: ElementId) -> Option<BandPlacement> {
        self.elements.get(&element).and_then(|e| e.placement)
    }

    pub fn label(&self, element: ElementId) -> Option<&str> {
        self.elements.get(&element).map(|e| e.label.as_str())
    }

    /// Total height of the band strip.
    pub fn strip_height(&self) -> f64 {
        self.band_top * 2.0 + self.band_height
    }

    /// Draw every placed element, oldest first.
    pub fn render_commands(&self) -> Vec<RenderCommand> {
        let mut commands = Vec::with_capacity(self.elements.len() * 5);
        for element in self.elements.values() {
            let Some(placement) = element.placement else {
                continue;
            };
            let [left, body, right] = band_regions(
                placement,
                self.band_top,
                self.band_height,
                self.handle_width,
            );

            commands.push(RenderCommand::BeginGroup {
                id: SharedStr::from(format!("band-{}", element.subtitle.0)),
                label: None,
            });
            commands.push(RenderCommand::DrawRect {
                rect: Rect::new(placement.x, self.band_top, placement.width, self.band_height),
                color: if element.dragging {
                    ThemeToken::BandDragging
                } else {
                    ThemeToken::BandFill
                },
                border_color: Some(ThemeToken::BandBorder),
                label: None,
                subtitle_id: Some(element.subtitle.0),
            });
            commands.push(RenderCommand::DrawRect {
                rect: body.1,
                color: if element.dragging {
                    ThemeToken::BandDragging
                } else {
                    ThemeToken::BandFill
                },
                border_color: None,
                label: Some(element.label.clone()),
                subtitle_id: Some(element.subtitle.0),
            });
            for (_, handle) in [left, right] {
                commands.push(RenderCommand::DrawRect {
                    rect: handle,
                    color: ThemeToken::BandHandle,
                    border_color: None,
                    label: None,
                    subtitle_id: Some(element.subtitle.0),
                });
            }
            commands.push(RenderCommand::EndGroup);
        }
        commands
    }
}

impl BandSurface for CommandSurface {
    type Handle = ElementId;

    fn create_band(&mut self, subtitle: &Subtitle) -> ElementId {
        let id = ElementId(self.next_id);
        self.next_id += 1;
        self.elements.insert(
            id,
            BandElement {
                subtitle: subtitle.id,
                label: band_label(&subtitle.text),
                placement: None,
                dragging: false,
            },
        );
        id
    }

    fn sync_band(&mut self, handle: &ElementId, subtitle: &Subtitle) {
        if let Some(element) = self.elements.get_mut(handle) {
            let label = band_label(&subtitle.text);
            if element.label != label {
                element.label = label;
            }
        }
    }

    fn place_band(&mut self, handle: &ElementId, placement: BandPlacement) {
        if let Some(element) = self.elements.get_mut(handle) {
            element.placement = Some(placement);
        }
    }

    fn destroy_band(&mut self, handle: ElementId) {
        self.elements.remove(&handle);
    }

    fn set_dragging(&mut self, handle: &ElementId, dragging: bool) {
        if let Some(element) = self.elements.get_mut(handle) {
            element.dragging = dragging;
        }
    }

    fn hit_test(&self, x: f64, y: f64) -> Option<(SubtitleId, DragRegion)> {
        // Newest elements are drawn last, so they are on top.
        self.elements.values().rev().find_map(|element| {
            let placement = element.placement?;
            band_regions(placement, self.band_top, self.band_height, self.handle_width)
                .into_iter()
                .find(|(_, rect)| rect.contains(x, y))
                .map(|(region, _)| (element.subtitle, region))
        })
    }
}

/// Subtitle text is rendered markup; bands show it as one plain line.
pub fn band_label(rendered: &str) -> SharedStr {
    let mut out = String::with_capacity(rendered.len());
    let mut rest = rendered;
    while let Some(open) = rest.find('<') {
        out.push_str(&rest[..open]);
        let Some(close) = rest[open..].find('>') else {
            rest = &rest[open..];
            break;
        };
        if rest[open..open + close].starts_with("<br") {
            out.push(' ');
        }
        rest = &rest[open + close + 1..];
    }
    out.push_str(rest);
    let out = out
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&amp;", "&");
    SharedStr::from(out)
}
