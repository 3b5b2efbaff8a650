use serde::{Deserialize, Serialize};

use super::bands::DragRegion;
use super::window::TimeWindow;
use crate::model::{Subtitle, SubtitleId};

/// One drag gesture in progress.
///
/// `snapshot_*` are the subtitle's times when the pointer went down. Every
/// move is applied to them, never to the provisional times of the previous
/// move, so a gesture cannot drift.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DragContext {
    pub subtitle: SubtitleId,
    pub region: DragRegion,
    pub snapshot_start: f64,
    pub snapshot_end: f64,
    pub origin_x: f64,
    /// Provisional times shown while dragging.
    pub start_time: f64,
    pub end_time: f64,
}

impl DragContext {
    fn apply(&mut self, delta_ms: f64) {
        let (start, end) = match self.region {
            DragRegion::LeftHandle => (self.snapshot_start + delta_ms, self.snapshot_end),
            DragRegion::RightHandle => (self.snapshot_start, self.snapshot_end + delta_ms),
            DragRegion::Body => (self.snapshot_start + delta_ms, self.snapshot_end + delta_ms),
        };
        self.start_time = start;
        self.end_time = end;
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum DragState {
    #[default]
    Idle,
    Dragging(DragContext),
}

/// The edit to write back when a drag is released.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DragCommit {
    pub subtitle: SubtitleId,
    pub start_time: f64,
    pub end_time: f64,
}

/// Pointer-driven state machine for moving band edges.
#[derive(Debug, Default)]
pub struct DragController {
    state: DragState,
}

impl DragController {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> &DragState {
        &self.state
    }

    pub fn is_dragging(&self) -> bool {
        matches!(self.state, DragState::Dragging(_))
    }

    pub fn context(&self) -> Option<&DragContext> {
        match &self.state {
            DragState::Dragging(ctx) => Some(ctx),
            DragState::Idle => None,
        }
    }

    /// Start a gesture on `region` of `subtitle`. Returns false, leaving the
    /// current gesture untouched, when one is already in progress.
    pub fn pointer_down(&mut self, subtitle: &Subtitle, region: DragRegion, x: f64) -> bool {
        if let DragState::Dragging(ctx) = &self.state {
            log::debug!(
                "pointer down on {} ignored: already dragging {}",
                subtitle.id,
                ctx.subtitle
            );
            return false;
        }
        log::debug!("drag start on {} ({region:?}) at x={x}", subtitle.id);
        self.state = DragState::Dragging(DragContext {
            subtitle: subtitle.id,
            region,
            snapshot_start: subtitle.start_time,
            snapshot_end: subtitle.end_time,
            origin_x: x,
            start_time: subtitle.start_time,
            end_time: subtitle.end_time,
        });
        true
    }

    /// Update the provisional times for a pointer at `x`.
    ///
    /// Returns the updated context, or `None` when idle or when the window
    /// has no pixel scale to convert with.
    pub fn pointer_move(&mut self, x: f64, window: &TimeWindow) -> Option<&DragContext> {
        if window.is_empty() {
            return None;
        }
        match &mut self.state {
            DragState::Dragging(ctx) => {
                ctx.apply(window.delta_ms(x - ctx.origin_x));
                Some(ctx)
            }
            DragState::Idle => None,
        }
    }

    /// Finish the gesture, yielding the single edit to commit.
    pub fn pointer_up(&mut self) -> Option<DragCommit> {
        match std::mem::take(&mut self.state) {
            DragState::Dragging(ctx) => {
                log::debug!(
                    "drag commit on {}: {}..{} ms",
                    ctx.subtitle,
                    ctx.start_time,
                    ctx.end_time
                );
                Some(DragCommit {
                    subtitle: ctx.subtitle,
                    start_time: ctx.start_time,
                    end_time: ctx.end_time,
                })
            }
            DragState::Idle => None,
        }
    }

    /// Abandon the gesture. Returns the subtitle whose element has to go
    /// back to its committed position.
    pub fn pointer_leave(&mut self) -> Option<SubtitleId> {
        match std::mem::take(&mut self.state) {
            DragState::Dragging(ctx) => {
                log::debug!("drag on {} cancelled", ctx.subtitle);
                Some(ctx.subtitle)
            }
            DragState::Idle => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::timeline::window::compute_window;

    fn subtitle() -> Subtitle {
        Subtitle {
            id: SubtitleId(7),
            start_time: 2_000.0,
            end_time: 4_000.0,
            text: "line".into(),
        }
    }

    // 125 px/s, so one pixel is exactly 8 ms.
    fn window() -> TimeWindow {
        compute_window(0.0, 1.25, 120.0, 600.0)
    }

    #[test]
    fn left_handle_moves_start_only() {
        let mut drag = DragController::new();
        assert!(drag.pointer_down(&subtitle(), DragRegion::LeftHandle, 200.0));
        let ctx = drag.pointer_move(150.0, &window()).copied();
        assert_eq!(ctx.map(|c| (c.start_time, c.end_time)), Some((1_600.0, 4_000.0)));
    }

    #[test]
    fn right_handle_moves_end_only() {
        let mut drag = DragController::new();
        drag.pointer_down(&subtitle(), DragRegion::RightHandle, 400.0);
        let ctx = drag.pointer_move(450.0, &window()).copied();
        assert_eq!(ctx.map(|c| (c.start_time, c.end_time)), Some((2_000.0, 4_400.0)));
    }

    #[test]
    fn body_shifts_both() {
        let mut drag = DragController::new();
        drag.pointer_down(&subtitle(), DragRegion::Body, 300.0);
        let ctx = drag.pointer_move(320.0, &window()).copied();
        assert_eq!(ctx.map(|c| (c.start_time, c.end_time)), Some((2_160.0, 4_160.0)));
    }

    #[test]
    fn moves_apply_to_snapshot_not_previous_move() {
        let mut drag = DragController::new();
        drag.pointer_down(&subtitle(), DragRegion::Body, 300.0);
        for x in [310.0, 350.0, 290.0, 330.0] {
            drag.pointer_move(x, &window());
        }
        let commit = drag.pointer_up();
        assert_eq!(
            commit,
            Some(DragCommit {
                subtitle: SubtitleId(7),
                start_time: 2_240.0,
                end_time: 4_240.0,
            })
        );
        assert!(!drag.is_dragging());
        assert_eq!(drag.pointer_up(), None);
    }

    #[test]
    fn release_without_moves_commits_snapshot() {
        let mut drag = DragController::new();
        drag.pointer_down(&subtitle(), DragRegion::LeftHandle, 200.0);
        let commit = drag.pointer_up();
        assert_eq!(commit.map(|c| (c.start_time, c.end_time)), Some((2_000.0, 4_000.0)));
    }

    #[test]
    fn leave_discards_and_returns_to_idle() {
        let mut drag = DragController::new();
        drag.pointer_down(&subtitle(), DragRegion::Body, 300.0);
        drag.pointer_move(500.0, &window());
        assert_eq!(drag.pointer_leave(), Some(SubtitleId(7)));
        assert_eq!(drag.state(), &DragState::Idle);
        assert_eq!(drag.pointer_up(), None);
        assert_eq!(drag.pointer_leave(), None);
    }

    #[test]
    fn second_pointer_down_is_rejected() {
        let mut drag = DragController::new();
        assert!(drag.pointer_down(&subtitle(), DragRegion::Body, 300.0));
        let other = Subtitle {
            id: SubtitleId(8),
            ..subtitle()
        };
        assert!(!drag.pointer_down(&other, DragRegion::LeftHandle, 10.0));
        assert_eq!(drag.context().map(|c| c.subtitle), Some(SubtitleId(7)));
        assert_eq!(drag.context().map(|c| c.origin_x), Some(300.0));
    }

    #[test]
    fn idle_and_empty_window_moves_are_ignored() {
        let mut drag = DragController::new();
        assert!(drag.pointer_move(10.0, &window()).is_none());
        drag.pointer_down(&subtitle(), DragRegion::Body, 300.0);
        assert!(drag.pointer_move(400.0, &TimeWindow::EMPTY).is_none());
        assert_eq!(drag.context().map(|c| c.start_time), Some(2_000.0));
    }
}
