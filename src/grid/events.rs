//! Character Events
//!
//! Synchronous, multicast event streams. Subscribers run to completion
//! before the emitting call returns; nothing is buffered.

use std::fmt;
use serde::{Serialize, Deserialize};

use crate::core::direction::Direction;
use crate::grid::position::{LayerPosition, PositionChange};

// =============================================================================
// SUBJECT
// =============================================================================

/// Handle returned by [`Subject::subscribe`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SubscriptionId(u64);

type Callback<T> = Box<dyn FnMut(&T)>;

/// A push-based event stream with any number of subscribers.
pub struct Subject<T> {
    next_id: u64,
    subscribers: Vec<(SubscriptionId, Callback<T>)>,
}

impl<T> Subject<T> {
    /// Create a stream with no subscribers.
    pub fn new() -> Self {
        Self {
            next_id: 0,
            subscribers: Vec::new(),
        }
    }

    /// Register a callback. Callbacks run in subscription order.
    pub fn subscribe<F>(&mut self, callback: F) -> SubscriptionId
    where
        F: FnMut(&T) + 'static,
    {
        let id = SubscriptionId(self.next_id);
        self.next_id += 1;
        self.subscribers.push((id, Box::new(callback)));
        id
    }

    /// Remove a callback. Returns false if it was not subscribed.
    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        let before = self.subscribers.len();
        self.subscribers.retain(|(sub_id, _)| *sub_id != id);
        self.subscribers.len() != before
    }

    /// Deliver a value to every subscriber.
    pub fn emit(&mut self, value: &T) {
        for (_, callback) in self.subscribers.iter_mut() {
            callback(value);
        }
    }

    /// Number of active subscribers.
    pub fn subscriber_count(&self) -> usize {
        self.subscribers.len()
    }
}

impl<T> Default for Subject<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> fmt::Debug for Subject<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subject")
            .field("subscribers", &self.subscribers.len())
            .finish()
    }
}

// =============================================================================
// CHARACTER EVENT STREAMS
// =============================================================================

/// The six lifecycle streams every character exposes.
#[derive(Debug, Default)]
pub struct CharacterEvents {
    /// Fired when a step begins.
    pub movement_started: Subject<Direction>,
    /// Fired when the character comes to rest.
    pub movement_stopped: Subject<Direction>,
    /// Fired when facing changes without motion (blocked move, turn).
    pub direction_changed: Subject<Direction>,
    /// Fired when a new destination tile is claimed.
    pub position_change_started: Subject<PositionChange>,
    /// Fired when the exit tile is released.
    pub position_change_finished: Subject<PositionChange>,
    /// Fired by an explicit teleport.
    pub tile_position_set: Subject<LayerPosition>,
}

/// A recorded character event, as returned from a world tick.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum CharacterEvent {
    /// Step began
    MovementStarted(Direction),
    /// Character came to rest
    MovementStopped(Direction),
    /// Facing changed without motion
    DirectionChanged(Direction),
    /// Destination tile claimed
    PositionChangeStarted(PositionChange),
    /// Exit tile released
    PositionChangeFinished(PositionChange),
    /// Teleported
    TilePositionSet(LayerPosition),
}

/// Subscription handles for one listener attached to all six streams.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct AllSubscriptions {
    movement_started: SubscriptionId,
    movement_stopped: SubscriptionId,
    direction_changed: SubscriptionId,
    position_change_started: SubscriptionId,
    position_change_finished: SubscriptionId,
    tile_position_set: SubscriptionId,
}

impl CharacterEvents {
    /// Attach one callback to every stream, converting payloads to [`CharacterEvent`].
    pub fn subscribe_all<F>(&mut self, callback: F) -> AllSubscriptions
    where
        F: FnMut(CharacterEvent) + 'static,
    {
        let shared = std::rc::Rc::new(std::cell::RefCell::new(callback));

        let cb = shared.clone();
        let movement_started = self
            .movement_started
            .subscribe(move |d| (&mut *cb.borrow_mut())(CharacterEvent::MovementStarted(*d)));
        let cb = shared.clone();
        let movement_stopped = self
            .movement_stopped
            .subscribe(move |d| (&mut *cb.borrow_mut())(CharacterEvent::MovementStopped(*d)));
        let cb = shared.clone();
        let direction_changed = self
            .direction_changed
            .subscribe(move |d| (&mut *cb.borrow_mut())(CharacterEvent::DirectionChanged(*d)));
        let cb = shared.clone();
        let position_change_started = self.position_change_started.subscribe(move |c| {
            (&mut *cb.borrow_mut())(CharacterEvent::PositionChangeStarted(c.clone()))
        });
        let cb = shared.clone();
        let position_change_finished = self.position_change_finished.subscribe(move |c| {
            (&mut *cb.borrow_mut())(CharacterEvent::PositionChangeFinished(c.clone()))
        });
        let cb = shared;
        let tile_position_set = self
            .tile_position_set
            .subscribe(move |p| (&mut *cb.borrow_mut())(CharacterEvent::TilePositionSet(p.clone())));

        AllSubscriptions {
            movement_started,
            movement_stopped,
            direction_changed,
            position_change_started,
            position_change_finished,
            tile_position_set,
        }
    }

    /// Detach a listener attached with [`CharacterEvents::subscribe_all`].
    pub fn unsubscribe_all(&mut self, subs: AllSubscriptions) {
        self.movement_started.unsubscribe(subs.movement_started);
        self.movement_stopped.unsubscribe(subs.movement_stopped);
        self.direction_changed.unsubscribe(subs.direction_changed);
        self.position_change_started.unsubscribe(subs.position_change_started);
        self.position_change_finished.unsubscribe(subs.position_change_finished);
        self.tile_position_set.unsubscribe(subs.tile_position_set);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::rc::Rc;

    #[test]
    fn test_multicast_in_order() {
        let log = Rc::new(RefCell::new(Vec::new()));
        let mut subject: Subject<u32> = Subject::new();

        let l1 = log.clone();
        subject.subscribe(move |v| l1.borrow_mut().push(("a", *v)));
        let l2 = log.clone();
        subject.subscribe(move |v| l2.borrow_mut().push(("b", *v)));

        subject.emit(&7);
        assert_eq!(*log.borrow(), vec![("a", 7), ("b", 7)]);
    }

    #[test]
    fn test_unsubscribe() {
        let count = Rc::new(RefCell::new(0));
        let mut subject: Subject<()> = Subject::new();

        let c = count.clone();
        let id = subject.subscribe(move |_| *c.borrow_mut() += 1);
        subject.emit(&());
        assert!(subject.unsubscribe(id));
        assert!(!subject.unsubscribe(id));
        subject.emit(&());

        assert_eq!(*count.borrow(), 1);
        assert_eq!(subject.subscriber_count(), 0);
    }

    #[test]
    fn test_subscribe_all_and_detach() {
        let log = Rc::new(RefCell::new(Vec::new()));
        let mut events = CharacterEvents::default();

        let l = log.clone();
        let subs = events.subscribe_all(move |e| l.borrow_mut().push(e));

        events.movement_started.emit(&Direction::Up);
        events.tile_position_set.emit(&LayerPosition::unlayered(1, 1));
        assert_eq!(
            *log.borrow(),
            vec![
                CharacterEvent::MovementStarted(Direction::Up),
                CharacterEvent::TilePositionSet(LayerPosition::unlayered(1, 1)),
            ]
        );

        events.unsubscribe_all(subs);
        events.movement_stopped.emit(&Direction::Up);
        assert_eq!(log.borrow().len(), 2);
        assert_eq!(events.movement_started.subscriber_count(), 0);
    }
}
