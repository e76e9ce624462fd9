//! Cross-widget highlight broadcast.
//!
//! Widgets never reference each other. Each one subscribes to the bus, ignores
//! events it raised itself and emphasises the intersection of the event's
//! case ids with the cases it currently renders.

use std::cell::RefCell;
use std::collections::HashSet;
use std::fmt;
use std::rc::{Rc, Weak};

use serde::{Deserialize, Serialize};

/// The widget an event originates from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Zone {
    EpiCurve,
    Map,
    Tree,
    LineList,
    Legend,
}

/// "These cases are of interest", raised by one zone.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HighlightEvent {
    /// An empty list clears all emphasis.
    pub case_ids: Vec<String>,
    pub origin: Zone,
}

impl HighlightEvent {
    pub fn new(case_ids: Vec<String>, origin: Zone) -> Self {
        Self { case_ids, origin }
    }

    /// Clear all emphasis.
    pub fn clear(origin: Zone) -> Self {
        Self {
            case_ids: Vec::new(),
            origin,
        }
    }
}

type Callback = Rc<dyn Fn(&HighlightEvent)>;

#[derive(Default)]
struct Subscribers {
    next_id: u64,
    entries: Vec<(u64, Callback)>,
}

/// Single-threaded publish/subscribe channel for highlight events.
///
/// Clones share the same subscribers.
#[derive(Clone, Default)]
pub struct HighlightBus {
    inner: Rc<RefCell<Subscribers>>,
}

impl fmt::Debug for HighlightBus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HighlightBus")
            .field("subscribers", &self.subscriber_count())
            .finish()
    }
}

impl HighlightBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a callback. It stays registered until the returned
    /// [`Subscription`] is dropped or unsubscribed.
    #[must_use = "dropping the subscription unsubscribes immediately"]
    pub fn subscribe(&self, callback: impl Fn(&HighlightEvent) + 'static) -> Subscription {
        let mut inner = self.inner.borrow_mut();
        let id = inner.next_id;
        inner.next_id += 1;
        inner.entries.push((id, Rc::new(callback)));
        Subscription {
            id,
            bus: Rc::downgrade(&self.inner),
        }
    }

    /// Deliver an event to every subscriber, in subscription order.
    ///
    /// Subscribers added or removed during delivery take effect for the next
    /// event.
    pub fn highlight(&self, event: HighlightEvent) {
        let callbacks: Vec<Callback> = self
            .inner
            .borrow()
            .entries
            .iter()
            .map(|(_, callback)| Rc::clone(callback))
            .collect();
        tracing::trace!(
            origin = ?event.origin,
            case_ids = event.case_ids.len(),
            subscribers = callbacks.len(),
            "highlight"
        );
        for callback in callbacks {
            callback(&event);
        }
    }

    pub fn subscriber_count(&self) -> usize {
        self.inner.borrow().entries.len()
    }

    /// Drop every subscriber.
    pub fn clear(&self) {
        // Callbacks may own subscriptions; drop them outside the borrow.
        let entries = std::mem::take(&mut self.inner.borrow_mut().entries);
        drop(entries);
    }
}

/// Handle of one subscription; dropping it unsubscribes.
#[derive(Debug)]
pub struct Subscription {
    id: u64,
    bus: Weak<RefCell<Subscribers>>,
}

impl Subscription {
    pub fn unsubscribe(self) {}
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(bus) = self.bus.upgrade() {
            let removed = {
                let mut inner = bus.borrow_mut();
                let position = inner.entries.iter().position(|(id, _)| *id == self.id);
                position.map(|index| inner.entries.remove(index))
            };
            drop(removed);
        }
    }
}

/// The receiving side of one widget.
#[derive(Debug, Clone)]
pub struct ZoneHighlighter {
    zone: Zone,
    rendered: HashSet<String>,
    emphasized: HashSet<String>,
}

impl ZoneHighlighter {
    pub fn new(zone: Zone) -> Self {
        Self {
            zone,
            rendered: HashSet::new(),
            emphasized: HashSet::new(),
        }
    }

    /// Replace the case ids the widget renders; emphasis outside them is dropped.
    pub fn set_rendered(&mut self, case_ids: impl IntoIterator<Item = String>) {
        self.rendered = case_ids.into_iter().collect();
        let rendered = &self.rendered;
        self.emphasized.retain(|id| rendered.contains(id));
    }

    /// Apply an event. Returns `false` when it came from this widget's own zone.
    pub fn receive(&mut self, event: &HighlightEvent) -> bool {
        if event.origin == self.zone {
            return false;
        }
        self.emphasized = event
            .case_ids
            .iter()
            .filter(|id| self.rendered.contains(id.as_str()))
            .cloned()
            .collect();
        true
    }

    /// Case ids currently emphasised.
    pub fn emphasized(&self) -> &HashSet<String> {
        &self.emphasized
    }
}
