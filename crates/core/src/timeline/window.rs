use serde::{Deserialize, Serialize};

/// The slice of the track currently visible in the timeline and its pixel
/// scale. Times are in seconds; subtitles are in milliseconds, and the
/// conversions between the two live on this type.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TimeWindow {
    pub start_time: f64,
    pub end_time: f64,
    pub pixels_per_second: f64,
    pub pixels_per_millisecond: f64,
}

/// Horizontal position and width of a band, in whole pixels.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BandPlacement {
    pub x: f64,
    pub width: f64,
}

impl TimeWindow {
    /// Window that shows nothing.
    pub const EMPTY: TimeWindow = TimeWindow {
        start_time: 0.0,
        end_time: 0.0,
        pixels_per_second: 0.0,
        pixels_per_millisecond: 0.0,
    };

    pub fn is_empty(&self) -> bool {
        self.pixels_per_second.is_nan() || self.pixels_per_second <= 0.0
    }

    /// Visible duration in seconds.
    pub fn span(&self) -> f64 {
        self.end_time - self.start_time
    }

    /// Pixel offset of a time given in seconds.
    pub fn time_to_x(&self, seconds: f64) -> f64 {
        (seconds - self.start_time) * self.pixels_per_second
    }

    /// Where a band for `[start_ms, end_ms)` goes.
    pub fn placement(&self, start_ms: f64, end_ms: f64) -> BandPlacement {
        BandPlacement {
            x: ((start_ms / 1000.0 - self.start_time) * self.pixels_per_second).floor(),
            width: ((end_ms - start_ms) * self.pixels_per_millisecond).floor(),
        }
    }

    /// Time offset in milliseconds covered by a horizontal pixel distance.
    pub fn delta_ms(&self, dx: f64) -> f64 {
        dx / self.pixels_per_millisecond
    }

    /// The visible range in milliseconds, for querying subtitles.
    pub fn range_ms(&self) -> (f64, f64) {
        (self.start_time * 1000.0, self.end_time * 1000.0)
    }
}

/// Compute the visible window.
///
/// The playback position sits in the middle of the viewport unless that
/// would show time past the end of the track (window pinned to the end) or
/// before zero (pinned to the start). The end clamp is applied first, so a
/// track shorter than the viewport is shown from zero, left-aligned.
///
/// `current_time` and `duration` are seconds, `scale` 1.0 is 100 px/s.
pub fn compute_window(
    current_time: f64,
    scale: f64,
    duration: f64,
    viewport_width: f64,
) -> TimeWindow {
    let pixels_per_second = (scale * 100.0).floor();
    if pixels_per_second.is_nan() || pixels_per_second <= 0.0 {
        return TimeWindow::EMPTY;
    }

    let visible = viewport_width / pixels_per_second;
    let mut start_time = current_time - (viewport_width / 2.0) / pixels_per_second;
    let max_start_time = duration - visible;
    if start_time > max_start_time {
        start_time = max_start_time;
    }
    if start_time < 0.0 {
        start_time = 0.0;
    }

    TimeWindow {
        start_time,
        end_time: start_time + visible,
        pixels_per_second,
        pixels_per_millisecond: pixels_per_second / 1000.0,
    }
}
