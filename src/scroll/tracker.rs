use std::{
    cell::{Cell, RefCell},
    rc::{Rc, Weak},
};

type Listener = Box<dyn FnMut(f32)>;

#[derive(Default)]
struct Listeners {
    next_id: u64,
    entries: Vec<(u64, Listener)>,
}

/// Host-side scroll event dispatcher.
///
/// Listeners must not subscribe or unsubscribe from inside `dispatch`.
#[derive(Default)]
pub struct ScrollEventSource {
    listeners: Rc<RefCell<Listeners>>,
}

impl ScrollEventSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe(&self, listener: impl FnMut(f32) + 'static) -> ScrollSubscription {
        let mut listeners = self.listeners.borrow_mut();
        let id = listeners.next_id;
        listeners.next_id += 1;
        listeners.entries.push((id, Box::new(listener)));

        ScrollSubscription {
            listeners: Rc::downgrade(&self.listeners),
            id,
            active: true,
        }
    }

    /// Delivers one scroll event to every live listener, in subscription order.
    pub fn dispatch(&self, offset: f32) {
        for (_, listener) in self.listeners.borrow_mut().entries.iter_mut() {
            listener(offset);
        }
    }

    #[cfg(test)]
    pub fn listener_count(&self) -> usize {
        self.listeners.borrow().entries.len()
    }
}

/// Registration handle returned by `ScrollEventSource::subscribe`.
///
/// Dropping the handle unsubscribes.
pub struct ScrollSubscription {
    listeners: Weak<RefCell<Listeners>>,
    id: u64,
    active: bool,
}

impl ScrollSubscription {
    /// Removes the listener. Returns false if it was already removed.
    pub fn unsubscribe(&mut self) -> bool {
        if !std::mem::replace(&mut self.active, false) {
            return false;
        }

        if let Some(listeners) = self.listeners.upgrade() {
            listeners
                .borrow_mut()
                .entries
                .retain(|(id, _)| *id != self.id);
        }

        true
    }

    #[cfg(test)]
    pub fn is_active(&self) -> bool {
        self.active
    }
}

impl Drop for ScrollSubscription {
    fn drop(&mut self) {
        self.unsubscribe();
    }
}

/// Latest scroll offset, overwritten by every scroll event.
pub struct ScrollPositionTracker {
    position: Rc<Cell<f32>>,
    subscription: ScrollSubscription,
}

impl ScrollPositionTracker {
    pub fn attach(source: &ScrollEventSource) -> Self {
        let position = Rc::new(Cell::new(0.0));

        let listener_position = position.clone();
        let subscription = source.subscribe(move |offset| {
            let previous = listener_position.replace(offset);
            if previous != offset {
                log::debug!("Scroll offset {} -> {}", previous, offset);
            }
        });

        Self {
            position,
            subscription,
        }
    }

    pub fn position(&self) -> f32 {
        self.position.get()
    }

    pub fn detach(&mut self) {
        if self.subscription.unsubscribe() {
            log::debug!("Scroll tracker detached at offset {}", self.position());
        }
    }

    #[cfg(test)]
    pub fn is_attached(&self) -> bool {
        self.subscription.is_active()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tracker_starts_at_zero() {
        let source = ScrollEventSource::new();
        let tracker = ScrollPositionTracker::attach(&source);

        assert_eq!(tracker.position(), 0.0);
        assert!(tracker.is_attached());
        assert_eq!(source.listener_count(), 1);
    }

    #[test]
    fn last_event_before_read_wins() {
        let source = ScrollEventSource::new();
        let tracker = ScrollPositionTracker::attach(&source);

        source.dispatch(120.0);
        source.dispatch(800.0);
        source.dispatch(310.0);

        assert_eq!(tracker.position(), 310.0);
    }

    #[test]
    fn raw_offsets_are_stored_unclamped() {
        let source = ScrollEventSource::new();
        let tracker = ScrollPositionTracker::attach(&source);

        source.dispatch(-5.0);
        assert_eq!(tracker.position(), -5.0);

        source.dispatch(1.0e7);
        assert_eq!(tracker.position(), 1.0e7);
    }

    #[test]
    fn detach_stops_updates_and_is_idempotent() {
        let source = ScrollEventSource::new();
        let mut tracker = ScrollPositionTracker::attach(&source);

        source.dispatch(200.0);
        tracker.detach();
        tracker.detach();
        source.dispatch(900.0);

        assert_eq!(tracker.position(), 200.0);
        assert!(!tracker.is_attached());
        assert_eq!(source.listener_count(), 0);
    }

    #[test]
    fn unsubscribe_reports_first_removal_only() {
        let source = ScrollEventSource::new();
        let mut subscription = source.subscribe(|_| {});

        assert!(subscription.unsubscribe());
        assert!(!subscription.unsubscribe());
        assert_eq!(source.listener_count(), 0);
    }

    #[test]
    fn dropping_subscription_unsubscribes() {
        let source = ScrollEventSource::new();
        {
            let _subscription = source.subscribe(|_| {});
            assert_eq!(source.listener_count(), 1);
        }
        assert_eq!(source.listener_count(), 0);
    }

    #[test]
    fn unsubscribe_leaves_other_listeners() {
        let source = ScrollEventSource::new();
        let first = ScrollPositionTracker::attach(&source);
        let mut second = ScrollPositionTracker::attach(&source);

        second.detach();
        source.dispatch(42.0);

        assert_eq!(first.position(), 42.0);
        assert_eq!(second.position(), 0.0);
    }

    #[test]
    fn subscription_outliving_source_is_harmless() {
        let source = ScrollEventSource::new();
        let mut tracker = ScrollPositionTracker::attach(&source);
        drop(source);

        tracker.detach();
        assert!(!tracker.is_attached());
    }
}
