//! The timeline: a seconds ruler above a strip of draggable subtitle bands.

pub mod bands;
pub mod drag;
pub mod surface;
pub mod ticks;
pub mod window;

pub use bands::{BandRenderer, BandSurface, DragRegion, band_regions};
pub use drag::{DragCommit, DragContext, DragController, DragState};
pub use surface::{CommandSurface, ElementId, band_label};
pub use ticks::render_ticks;
pub use window::{BandPlacement, TimeWindow, compute_window};

use subline_protocol::RenderCommand;

use crate::config::TimelineConfig;
use crate::events::{EditorEvent, EventBus, ListName, Subscription, Topic};
use crate::model::{CollectionError, SubtitleCollection};

/// Timeline view over the working subtitles.
///
/// Listens to clock, document and work events on the bus. [`Timeline::pump`]
/// applies what arrived since the last call: a changed clock or viewport
/// recomputes the window and redraws the ruler, a freshly fetched working
/// document resets the band registry, and any of those re-renders the bands.
///
/// The subtitle collection is not owned here. Every call that needs it takes
/// it as an argument, `None` meaning nothing is loaded yet.
pub struct Timeline<S: BandSurface = CommandSurface> {
    config: TimelineConfig,
    current_time: f64,
    duration: f64,
    scale: f64,
    width: f64,
    window: TimeWindow,
    ruler: Vec<RenderCommand>,
    bands: BandRenderer<S>,
    drag: DragController,
    events: Subscription,
    bus: EventBus,
}

impl<S: BandSurface> Timeline<S> {
    pub fn new(surface: S, bus: &EventBus, config: TimelineConfig) -> Self {
        let mut timeline = Self {
            current_time: 0.0,
            duration: 0.0,
            scale: config.scale,
            width: 0.0,
            window: TimeWindow::EMPTY,
            ruler: Vec::new(),
            bands: BandRenderer::new(surface),
            drag: DragController::new(),
            events: bus.subscribe(&[Topic::Clock, Topic::Document, Topic::Work]),
            bus: bus.clone(),
            config,
        };
        timeline.recompute_window();
        timeline
    }

    pub fn config(&self) -> &TimelineConfig {
        &self.config
    }

    pub fn window(&self) -> &TimeWindow {
        &self.window
    }

    /// Ruler commands from the last window change.
    pub fn ruler_commands(&self) -> &[RenderCommand] {
        &self.ruler
    }

    pub fn bands(&self) -> &BandRenderer<S> {
        &self.bands
    }

    pub fn drag(&self) -> &DragController {
        &self.drag
    }

    pub fn is_dragging(&self) -> bool {
        self.drag.is_dragging()
    }

    /// Apply pending bus events. Returns true if anything was redrawn.
    pub fn pump<C>(&mut self, collection: Option<&C>) -> bool
    where
        C: SubtitleCollection + ?Sized,
    {
        let mut window_dirty = false;
        let mut bands_dirty = false;

        for event in self.events.drain() {
            match event {
                EditorEvent::ClockChanged {
                    current_time,
                    duration,
                    scale,
                } => {
                    self.current_time = current_time;
                    self.duration = duration;
                    self.scale = scale;
                    window_dirty = true;
                }
                EditorEvent::ViewportResized { width } => {
                    self.width = width;
                    window_dirty = true;
                }
                EditorEvent::SubtitlesFetched(ListName::Working) => {
                    self.drag.pointer_leave();
                    self.bands.clear();
                    bands_dirty = true;
                }
                EditorEvent::SubtitlesFetched(ListName::Reference) => {}
                EditorEvent::WorkDone { .. } => bands_dirty = true,
                EditorEvent::Saved => {}
            }
        }

        if window_dirty {
            self.recompute_window();
        }
        if window_dirty || bands_dirty {
            self.render_bands(collection);
        }
        window_dirty || bands_dirty
    }

    /// Recompute everything regardless of pending events.
    pub fn refresh<C>(&mut self, collection: Option<&C>)
    where
        C: SubtitleCollection + ?Sized,
    {
        self.recompute_window();
        self.render_bands(collection);
    }

    /// Pointer pressed at `(x, y)` in band-strip coordinates. Returns true
    /// when a drag started, in which case the frontend should suppress its
    /// native drag handling.
    pub fn pointer_down<C>(&mut self, x: f64, y: f64, collection: Option<&C>) -> bool
    where
        C: SubtitleCollection + ?Sized,
    {
        let Some((id, region)) = self.bands.hit_test(x, y) else {
            return false;
        };
        let Some(subtitle) = collection.and_then(|c| c.subtitle(id)) else {
            log::debug!("pointer down on stale element for {id}");
            return false;
        };
        if !self.drag.pointer_down(subtitle, region, x) {
            return false;
        }
        self.bands.set_dragging(id, true);
        true
    }

    /// Pointer moved to `x`. Returns true if a dragged band moved.
    pub fn pointer_move(&mut self, x: f64) -> bool {
        let Some(ctx) = self.drag.pointer_move(x, &self.window).copied() else {
            return false;
        };
        self.bands
            .place(ctx.subtitle, ctx.start_time, ctx.end_time, &self.window)
    }

    /// Pointer released: commit the drag as one update, re-render the bands
    /// and announce the edit.
    pub fn pointer_up<C>(
        &mut self,
        collection: Option<&mut C>,
    ) -> Result<Option<DragCommit>, CollectionError>
    where
        C: SubtitleCollection + ?Sized,
    {
        let Some(commit) = self.drag.pointer_up() else {
            return Ok(None);
        };
        self.bands.set_dragging(commit.subtitle, false);
        let Some(collection) = collection else {
            log::warn!("drag on {} released with no subtitles loaded", commit.subtitle);
            return Ok(None);
        };

        let result =
            collection.update_subtitle_time(commit.subtitle, commit.start_time, commit.end_time);
        self.bands.render(Some(&*collection), &self.window);
        result?;

        self.bus.publish(EditorEvent::WorkDone {
            subtitle: Some(commit.subtitle),
        });
        Ok(Some(commit))
    }

    /// Pointer left the timeline: drop the drag and put the band back.
    pub fn pointer_leave<C>(&mut self, collection: Option<&C>) -> bool
    where
        C: SubtitleCollection + ?Sized,
    {
        let Some(id) = self.drag.pointer_leave() else {
            return false;
        };
        self.bands.set_dragging(id, false);
        match collection.and_then(|c| c.subtitle(id)) {
            Some(subtitle) => {
                let (start, end) = (subtitle.start_time, subtitle.end_time);
                self.bands.place(id, start, end, &self.window);
            }
            None => self.bands.render(collection, &self.window),
        }
        true
    }

    fn recompute_window(&mut self) {
        self.window = compute_window(self.current_time, self.scale, self.duration, self.width);
        self.ruler = render_ticks(&self.window, self.width, self.config.ruler_height);
    }

    fn render_bands<C>(&mut self, collection: Option<&C>)
    where
        C: SubtitleCollection + ?Sized,
    {
        self.bands.render(collection, &self.window);
        // Keep a band being dragged where the pointer put it.
        if let Some(ctx) = self.drag.context().copied() {
            self.bands
                .place(ctx.subtitle, ctx.start_time, ctx.end_time, &self.window);
        }
    }
}

impl Timeline<CommandSurface> {
    pub fn with_config(bus: &EventBus, config: TimelineConfig) -> Self {
        let surface = CommandSurface::new(&config);
        Self::new(surface, bus, config)
    }

    /// Band strip commands for the current frame.
    pub fn band_commands(&self) -> Vec<RenderCommand> {
        self.bands.surface().render_commands()
    }

    pub fn band_strip_height(&self) -> f64 {
        self.bands.surface().strip_height()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::PlaybackClock;
    use crate::model::{Subtitle, SubtitleId, SubtitleList};
    use crate::timeline::bands::tests::RecordingSurface;

    /// Collection that counts update calls.
    struct Counting {
        inner: SubtitleList,
        updates: usize,
    }

    impl SubtitleCollection for Counting {
        fn subtitles_for_time(&self, start_ms: f64, end_ms: f64) -> Vec<&Subtitle> {
            self.inner.subtitles_for_time(start_ms, end_ms)
        }

        fn subtitle(&self, id: SubtitleId) -> Option<&Subtitle> {
            self.inner.subtitle(id)
        }

        fn update_subtitle_time(
            &mut self,
            id: SubtitleId,
            start_ms: f64,
            end_ms: f64,
        ) -> Result<(), CollectionError> {
            self.updates += 1;
            self.inner.update_subtitle_time(id, start_ms, end_ms)
        }
    }

    fn collection() -> Counting {
        let mut inner = SubtitleList::new();
        inner.push(2_000.0, 4_000.0, "first");
        inner.push(5_000.0, 5_500.0, "second");
        Counting { inner, updates: 0 }
    }

    /// Timeline showing 0..6 s at 100 px/s.
    fn setup() -> (EventBus, PlaybackClock, Timeline<RecordingSurface>, Counting) {
        let bus = EventBus::new();
        let mut timeline = Timeline::new(RecordingSurface::default(), &bus, TimelineConfig::default());
        let mut clock = PlaybackClock::new(&bus, 1.0);
        clock.set_duration(120.0);
        clock.set_viewport_width(600.0);
        let collection = collection();
        timeline.pump(Some(&collection));
        (bus, clock, timeline, collection)
    }

    fn times(c: &Counting, id: u64) -> (f64, f64) {
        c.inner
            .subtitle(SubtitleId(id))
            .map(|s| (s.start_time, s.end_time))
            .unwrap_or_default()
    }

    #[test]
    fn pump_follows_clock() {
        let (_bus, mut clock, mut timeline, collection) = setup();
        assert_eq!(timeline.window().start_time, 0.0);
        assert_eq!(timeline.bands().len(), 2);
        assert!(!timeline.ruler_commands().is_empty());

        clock.set_current_time(100.0);
        assert!(timeline.pump(Some(&collection)));
        assert_eq!(timeline.window().start_time, 97.0);
        assert!(timeline.bands().is_empty());

        assert!(!timeline.pump(Some(&collection)));
    }

    #[test]
    fn drag_then_leave_leaves_subtitle_untouched() {
        let (_bus, _clock, mut timeline, mut collection) = setup();
        let before = times(&collection, 0);

        assert!(timeline.pointer_down(300.0, 10.0, Some(&collection)));
        assert!(timeline.pointer_move(350.0));
        assert!(timeline.pointer_move(420.0));
        assert!(timeline.pointer_leave(Some(&collection)));

        let after = times(&collection, 0);
        assert_eq!(before.0.to_bits(), after.0.to_bits());
        assert_eq!(before.1.to_bits(), after.1.to_bits());
        assert_eq!(collection.updates, 0);
        assert!(!timeline.is_dragging());
        assert_eq!(timeline.pointer_up(Some(&mut collection)), Ok(None));

        let h = timeline.bands().handle(SubtitleId(0)).copied().unwrap_or_default();
        assert_eq!(
            timeline.bands().surface().placements.get(&h),
            Some(&BandPlacement { x: 200.0, width: 200.0 })
        );
    }

    #[test]
    fn release_commits_exactly_once() {
        for moves in [0usize, 1, 5, 40] {
            let (bus, _clock, mut timeline, mut collection) = setup();
            let work = bus.subscribe(&[Topic::Work]);

            assert!(timeline.pointer_down(300.0, 10.0, Some(&collection)));
            for i in 0..moves {
                timeline.pointer_move(300.0 + i as f64);
            }
            if moves > 0 {
                timeline.pointer_move(350.0);
            }
            let commit = timeline.pointer_up(Some(&mut collection));

            assert_eq!(collection.updates, 1, "moves={moves}");
            let expected = if moves > 0 { (2_500.0, 4_500.0) } else { (2_000.0, 4_000.0) };
            assert_eq!(times(&collection, 0), expected);
            assert_eq!(
                commit.ok().flatten().map(|c| c.subtitle),
                Some(SubtitleId(0))
            );
            assert_eq!(
                work.drain(),
                vec![EditorEvent::WorkDone {
                    subtitle: Some(SubtitleId(0))
                }]
            );
        }
    }

    #[test]
    fn elements_keep_identity_during_and_after_drag() {
        let (_bus, _clock, mut timeline, mut collection) = setup();
        let before = timeline.bands().handle(SubtitleId(0)).copied();

        // Left handle: only the start moves.
        timeline.pointer_down(203.0, 10.0, Some(&collection));
        timeline.pointer_move(253.0);
        let _ = timeline.pointer_up(Some(&mut collection));
        timeline.pump(Some(&collection));

        assert!(before.is_some());
        assert_eq!(timeline.bands().handle(SubtitleId(0)).copied(), before);
        assert_eq!(timeline.bands().surface().created.len(), 2);
        assert_eq!(times(&collection, 0), (2_500.0, 4_000.0));
    }

    #[test]
    fn second_pointer_down_does_not_restart_drag() {
        let (_bus, _clock, mut timeline, collection) = setup();
        assert!(timeline.pointer_down(300.0, 10.0, Some(&collection)));
        assert!(!timeline.pointer_down(520.0, 10.0, Some(&collection)));
        assert_eq!(
            timeline.drag().context().map(|c| c.subtitle),
            Some(SubtitleId(0))
        );
    }

    #[test]
    fn pointer_down_on_empty_space_or_stale_element_is_noop() {
        let (_bus, _clock, mut timeline, mut collection) = setup();
        assert!(!timeline.pointer_down(50.0, 10.0, Some(&collection)));

        collection.inner.remove(SubtitleId(0));
        assert!(!timeline.pointer_down(300.0, 10.0, Some(&collection)));
        assert!(!timeline.pointer_down(300.0, 10.0, None::<&SubtitleList>));
        assert!(!timeline.is_dragging());
    }

    #[test]
    fn fresh_document_resets_registry() {
        let (bus, _clock, mut timeline, collection) = setup();
        bus.publish(EditorEvent::SubtitlesFetched(ListName::Working));
        timeline.pump(Some(&collection));
        assert_eq!(timeline.bands().surface().destroyed.len(), 2);
        assert_eq!(timeline.bands().surface().created.len(), 4);

        // Reference documents do not touch the timeline.
        bus.publish(EditorEvent::SubtitlesFetched(ListName::Reference));
        assert!(!timeline.pump(Some(&collection)));
    }

    #[test]
    fn scrolling_keeps_dragged_band_at_pointer() {
        let (_bus, mut clock, mut timeline, collection) = setup();
        timeline.pointer_down(300.0, 10.0, Some(&collection));
        timeline.pointer_move(400.0);

        // Window 1..7 s after this.
        clock.set_current_time(4.0);
        timeline.pump(Some(&collection));
        let h = timeline.bands().handle(SubtitleId(0)).copied().unwrap_or_default();
        assert_eq!(
            timeline.bands().surface().placements.get(&h),
            Some(&BandPlacement { x: 200.0, width: 200.0 })
        );
    }
}
