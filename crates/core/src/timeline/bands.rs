use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use subline_protocol::Rect;

use super::window::{BandPlacement, TimeWindow};
use crate::model::{Subtitle, SubtitleCollection, SubtitleId};

/// The part of a band a drag started on, and therefore which edges it moves.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DragRegion {
    /// Moves the start time only.
    LeftHandle,
    /// Moves both times.
    Body,
    /// Moves the end time only.
    RightHandle,
}

/// Split a placed band into its three draggable regions.
///
/// Handles sit inside the band at either edge. When the band is narrower
/// than two handles the left handle wins the overlap.
pub fn band_regions(
    placement: BandPlacement,
    top: f64,
    height: f64,
    handle_width: f64,
) -> [(DragRegion, Rect); 3] {
    let width = placement.width.max(0.0);
    let handle = handle_width.min(width);
    let left = Rect::new(placement.x, top, handle, height);
    let right_x = (placement.x + width - handle).max(left.right());
    let right = Rect::new(right_x, top, placement.x + width - right_x, height);
    let body = Rect::new(left.right(), top, (right_x - left.right()).max(0.0), height);
    [
        (DragRegion::LeftHandle, left),
        (DragRegion::Body, body),
        (DragRegion::RightHandle, right),
    ]
}

/// Rendering backend for subtitle bands.
///
/// A handle is an opaque reference to one on-screen element (a retained
/// widget, a DOM node, an entry in a command list). Each element has a left
/// handle, a body showing the text and a right handle, and the surface must
/// report pointer hits on them as the matching [`DragRegion`].
pub trait BandSurface {
    type Handle;

    fn create_band(&mut self, subtitle: &Subtitle) -> Self::Handle;

    /// Refresh content of an element that is being reused.
    fn sync_band(&mut self, _handle: &Self::Handle, _subtitle: &Subtitle) {}

    fn place_band(&mut self, handle: &Self::Handle, placement: BandPlacement);

    fn destroy_band(&mut self, handle: Self::Handle);

    /// Highlight the element while a drag on it is in progress.
    fn set_dragging(&mut self, _handle: &Self::Handle, _dragging: bool) {}

    fn hit_test(&self, x: f64, y: f64) -> Option<(SubtitleId, DragRegion)>;
}

/// Keeps exactly one surface element per visible subtitle.
pub struct BandRenderer<S: BandSurface> {
    surface: S,
    elements: HashMap<SubtitleId, S::Handle>,
}

impl<S: BandSurface> BandRenderer<S> {
    pub fn new(surface: S) -> Self {
        Self {
            surface,
            elements: HashMap::new(),
        }
    }

    pub fn surface(&self) -> &S {
        &self.surface
    }

    pub fn surface_mut(&mut self) -> &mut S {
        &mut self.surface
    }

    /// Number of live elements.
    pub fn len(&self) -> usize {
        self.elements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }

    pub fn handle(&self, id: SubtitleId) -> Option<&S::Handle> {
        self.elements.get(&id)
    }

    /// Ids with a live element, in no particular order.
    pub fn visible_ids(&self) -> impl Iterator<Item = SubtitleId> + '_ {
        self.elements.keys().copied()
    }

    /// Bring the elements in line with the subtitles visible in `window`.
    ///
    /// Elements of subtitles still visible are reused, new ones are created,
    /// and the ones whose subtitle left the window (or the collection) are
    /// destroyed. Without a collection the pass is skipped.
    pub fn render<C>(&mut self, collection: Option<&C>, window: &TimeWindow)
    where
        C: SubtitleCollection + ?Sized,
    {
        let Some(collection) = collection else {
            log::debug!("band render skipped: no subtitles loaded");
            return;
        };

        let (start_ms, end_ms) = window.range_ms();
        let visible = collection.subtitles_for_time(start_ms, end_ms);

        let mut previous = std::mem::take(&mut self.elements);
        let mut created = 0usize;
        for subtitle in visible {
            let handle = match previous.remove(&subtitle.id) {
                Some(handle) => {
                    self.surface.sync_band(&handle, subtitle);
                    handle
                }
                None => {
                    created += 1;
                    self.surface.create_band(subtitle)
                }
            };
            self.surface.place_band(
                &handle,
                window.placement(subtitle.start_time, subtitle.end_time),
            );
            self.elements.insert(subtitle.id, handle);
        }

        let removed = previous.len();
        for (_, handle) in previous {
            self.surface.destroy_band(handle);
        }

        log::debug!(
            "bands rendered: {} visible, {created} created, {removed} removed",
            self.elements.len()
        );
    }

    /// Move one element without touching the subtitle. Returns false when
    /// the subtitle has no element.
    pub fn place(&mut self, id: SubtitleId, start_ms: f64, end_ms: f64, window: &TimeWindow) -> bool {
        match self.elements.get(&id) {
            Some(handle) => {
                self.surface
                    .place_band(handle, window.placement(start_ms, end_ms));
                true
            }
            None => false,
        }
    }

    pub fn set_dragging(&mut self, id: SubtitleId, dragging: bool) {
        if let Some(handle) = self.elements.get(&id) {
            self.surface.set_dragging(handle, dragging);
        }
    }

    /// Resolve a pointer position to a live element's region.
    pub fn hit_test(&self, x: f64, y: f64) -> Option<(SubtitleId, DragRegion)> {
        self.surface
            .hit_test(x, y)
            .filter(|(id, _)| self.elements.contains_key(id))
    }

    /// Destroy every element, e.g. before a different document is shown.
    pub fn clear(&mut self) {
        for (_, handle) in self.elements.drain() {
            self.surface.destroy_band(handle);
        }
    }
}
