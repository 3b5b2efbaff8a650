use crate::events::{EditorEvent, EventBus, Subscription, Topic};

use super::subtitle_list::{ListError, SubtitleListController};

/// Enables saving once there is work to save.
#[derive(Debug)]
pub struct SaveSessionButton {
    can_save: bool,
    events: Subscription,
}

impl SaveSessionButton {
    pub fn new(bus: &EventBus) -> Self {
        Self {
            can_save: false,
            events: bus.subscribe(&[Topic::Work, Topic::Storage]),
        }
    }

    pub fn can_save(&self) -> bool {
        self.can_save
    }

    /// Apply pending events. Returns true if the enabled state changed.
    pub fn pump(&mut self) -> bool {
        let before = self.can_save;
        for event in self.events.drain() {
            match event {
                EditorEvent::WorkDone { .. } => self.can_save = true,
                EditorEvent::Saved => self.can_save = false,
                _ => {}
            }
        }
        before != self.can_save
    }

    /// Save the working subtitles.
    pub fn save_session(&mut self, working: &mut SubtitleListController) -> Result<(), ListError> {
        working.save_subtitles()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::SubtitleId;

    #[test]
    fn enabled_by_work_and_reset_by_save() {
        let bus = EventBus::new();
        let mut button = SaveSessionButton::new(&bus);
        assert!(!button.can_save());
        assert!(!button.pump());

        bus.publish(EditorEvent::WorkDone {
            subtitle: Some(SubtitleId(1)),
        });
        assert!(button.pump());
        assert!(button.can_save());

        bus.publish(EditorEvent::WorkDone { subtitle: None });
        assert!(!button.pump());

        bus.publish(EditorEvent::Saved);
        assert!(button.pump());
        assert!(!button.can_save());
    }

    #[test]
    fn ignores_clock_events() {
        let bus = EventBus::new();
        let mut button = SaveSessionButton::new(&bus);
        bus.publish(EditorEvent::ViewportResized { width: 10.0 });
        assert!(!button.pump());
    }
}
