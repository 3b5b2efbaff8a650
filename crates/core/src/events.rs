//! Publish/subscribe between editor components.
//!
//! Publishers never call into subscribers. Each subscription owns a queue
//! that the bus appends to; the subscriber drains it when it next runs. A
//! component can therefore publish from inside its own handler without
//! re-entering itself.

use std::cell::RefCell;
use std::collections::VecDeque;
use std::rc::{Rc, Weak};

use crate::model::SubtitleId;

/// Which subtitle list an event concerns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ListName {
    /// The subtitles being edited.
    Working,
    /// The read-only reference set shown alongside.
    Reference,
}

#[derive(Debug, Clone, PartialEq)]
pub enum EditorEvent {
    /// Playback position, duration or zoom changed.
    ClockChanged {
        current_time: f64,
        duration: f64,
        scale: f64,
    },
    /// The timeline viewport changed width.
    ViewportResized { width: f64 },
    /// A fresh document was loaded into a list.
    SubtitlesFetched(ListName),
    /// Subtitle content or timing was edited.
    WorkDone { subtitle: Option<SubtitleId> },
    /// The working document was persisted.
    Saved,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Topic {
    Clock,
    Document,
    Work,
    Storage,
}

impl EditorEvent {
    pub fn topic(&self) -> Topic {
        match self {
            Self::ClockChanged { .. } | Self::ViewportResized { .. } => Topic::Clock,
            Self::SubtitlesFetched(_) => Topic::Document,
            Self::WorkDone { .. } => Topic::Work,
            Self::Saved => Topic::Storage,
        }
    }
}

type Queue = RefCell<VecDeque<EditorEvent>>;

struct Subscriber {
    topics: Vec<Topic>,
    queue: Weak<Queue>,
}

/// Cheaply cloneable handle to one event bus.
#[derive(Clone, Default)]
pub struct EventBus {
    subscribers: Rc<RefCell<Vec<Subscriber>>>,
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start receiving events on the given topics. Dropping the returned
    /// subscription unsubscribes.
    pub fn subscribe(&self, topics: &[Topic]) -> Subscription {
        let queue = Rc::new(RefCell::new(VecDeque::new()));
        self.subscribers.borrow_mut().push(Subscriber {
            topics: topics.to_vec(),
            queue: Rc::downgrade(&queue),
        });
        Subscription { queue }
    }

    pub fn publish(&self, event: EditorEvent) {
        let topic = event.topic();
        let mut subscribers = self.subscribers.borrow_mut();
        subscribers.retain(|s| s.queue.strong_count() > 0);
        for subscriber in subscribers.iter() {
            if !subscriber.topics.contains(&topic) {
                continue;
            }
            if let Some(queue) = subscriber.queue.upgrade() {
                queue.borrow_mut().push_back(event.clone());
            }
        }
    }

    pub fn subscriber_count(&self) -> usize {
        self.subscribers
            .borrow()
            .iter()
            .filter(|s| s.queue.strong_count() > 0)
            .count()
    }
}

impl std::fmt::Debug for EventBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventBus")
            .field("subscribers", &self.subscriber_count())
            .finish()
    }
}

/// Receiving end of a subscription.
#[derive(Debug)]
pub struct Subscription {
    queue: Rc<Queue>,
}

impl Subscription {
    /// Take every pending event, oldest first.
    pub fn drain(&self) -> Vec<EditorEvent> {
        self.queue.borrow_mut().drain(..).collect()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.borrow().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn delivers_only_subscribed_topics() {
        let bus = EventBus::new();
        let clock = bus.subscribe(&[Topic::Clock]);
        let work = bus.subscribe(&[Topic::Work, Topic::Storage]);

        bus.publish(EditorEvent::ViewportResized { width: 600.0 });
        bus.publish(EditorEvent::WorkDone { subtitle: None });
        bus.publish(EditorEvent::Saved);

        assert_eq!(
            clock.drain(),
            vec![EditorEvent::ViewportResized { width: 600.0 }]
        );
        assert_eq!(
            work.drain(),
            vec![EditorEvent::WorkDone { subtitle: None }, EditorEvent::Saved]
        );
        assert!(work.is_empty());
    }

    #[test]
    fn every_subscriber_gets_its_own_copy() {
        let bus = EventBus::new();
        let a = bus.subscribe(&[Topic::Document]);
        let b = bus.subscribe(&[Topic::Document]);
        bus.publish(EditorEvent::SubtitlesFetched(ListName::Working));
        assert_eq!(a.drain().len(), 1);
        assert_eq!(b.drain().len(), 1);
    }

    #[test]
    fn dropped_subscription_unsubscribes() {
        let bus = EventBus::new();
        let kept = bus.subscribe(&[Topic::Work]);
        {
            let _dropped = bus.subscribe(&[Topic::Work]);
            assert_eq!(bus.subscriber_count(), 2);
        }
        bus.publish(EditorEvent::WorkDone { subtitle: None });
        assert_eq!(bus.subscriber_count(), 1);
        assert_eq!(kept.drain().len(), 1);
    }

    #[test]
    fn publishing_from_a_clone_reaches_the_same_subscribers() {
        let bus = EventBus::new();
        let sub = bus.subscribe(&[Topic::Storage]);
        let clone = bus.clone();
        clone.publish(EditorEvent::Saved);
        assert_eq!(sub.drain(), vec![EditorEvent::Saved]);
    }
}
