use crate::events::{EditorEvent, EventBus};

/// Playback position, track duration, zoom and viewport width, observed by
/// the timeline.
///
/// Setters publish on the bus only when a value actually changes, so the
/// timeline recomputes its window exactly when something it depends on moved.
#[derive(Debug)]
pub struct PlaybackClock {
    current_time: f64,
    duration: f64,
    scale: f64,
    viewport_width: f64,
    bus: EventBus,
}

impl PlaybackClock {
    pub fn new(bus: &EventBus, scale: f64) -> Self {
        Self {
            current_time: 0.0,
            duration: 0.0,
            scale,
            viewport_width: 0.0,
            bus: bus.clone(),
        }
    }

    /// Seconds.
    pub fn current_time(&self) -> f64 {
        self.current_time
    }

    /// Seconds.
    pub fn duration(&self) -> f64 {
        self.duration
    }

    pub fn scale(&self) -> f64 {
        self.scale
    }

    pub fn viewport_width(&self) -> f64 {
        self.viewport_width
    }

    pub fn set_current_time(&mut self, seconds: f64) {
        let seconds = seconds.max(0.0);
        if seconds != self.current_time {
            self.current_time = seconds;
            self.publish_clock();
        }
    }

    pub fn set_duration(&mut self, seconds: f64) {
        let seconds = seconds.max(0.0);
        if seconds != self.duration {
            self.duration = seconds;
            self.publish_clock();
        }
    }

    pub fn set_scale(&mut self, scale: f64) {
        if scale != self.scale {
            self.scale = scale;
            self.publish_clock();
        }
    }

    /// Advance playback, stopping at the end of the track.
    pub fn advance(&mut self, seconds: f64) {
        let next = (self.current_time + seconds).min(self.duration);
        self.set_current_time(next);
    }

    /// Whole pixels only; fractional widths are floored.
    pub fn set_viewport_width(&mut self, width: f64) {
        let width = width.max(0.0).floor();
        if width != self.viewport_width {
            self.viewport_width = width;
            self.bus.publish(EditorEvent::ViewportResized { width });
        }
    }

    /// Re-announce every value, e.g. for a component that subscribed late.
    pub fn republish(&self) {
        self.publish_clock();
        self.bus.publish(EditorEvent::ViewportResized {
            width: self.viewport_width,
        });
    }

    fn publish_clock(&self) {
        self.bus.publish(EditorEvent::ClockChanged {
            current_time: self.current_time,
            duration: self.duration,
            scale: self.scale,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::Topic;

    #[test]
    fn publishes_only_on_change() {
        let bus = EventBus::new();
        let sub = bus.subscribe(&[Topic::Clock]);
        let mut clock = PlaybackClock::new(&bus, 1.0);

        clock.set_duration(120.0);
        clock.set_duration(120.0);
        clock.set_current_time(5.0);
        clock.set_scale(1.0);

        assert_eq!(
            sub.drain(),
            vec![
                EditorEvent::ClockChanged {
                    current_time: 0.0,
                    duration: 120.0,
                    scale: 1.0
                },
                EditorEvent::ClockChanged {
                    current_time: 5.0,
                    duration: 120.0,
                    scale: 1.0
                },
            ]
        );
    }

    #[test]
    fn viewport_width_is_floored() {
        let bus = EventBus::new();
        let sub = bus.subscribe(&[Topic::Clock]);
        let mut clock = PlaybackClock::new(&bus, 1.0);
        clock.set_viewport_width(600.7);
        clock.set_viewport_width(600.2);
        assert_eq!(clock.viewport_width(), 600.0);
        assert_eq!(sub.drain(), vec![EditorEvent::ViewportResized { width: 600.0 }]);
    }

    #[test]
    fn advance_stops_at_end() {
        let bus = EventBus::new();
        let mut clock = PlaybackClock::new(&bus, 1.0);
        clock.set_duration(10.0);
        clock.set_current_time(9.5);
        clock.advance(2.0);
        assert_eq!(clock.current_time(), 10.0);
    }
}
