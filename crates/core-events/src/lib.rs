//! core-events: broadcast events with detachable subscriptions.
//!
//! An [`Event`] is a list of handlers invoked in registration order. The
//! slot list tolerates mutation mid-dispatch: a handler may disconnect
//! itself or any other handler while the walk is in progress. Disconnected
//! slots are tombstoned immediately and swept once the outermost dispatch
//! unwinds.
//!
//! Everything here is thread-confined; handlers are plain `FnMut` closures
//! on the reactor thread.

use std::cell::{Cell, RefCell};
use std::rc::{Rc, Weak};

use tracing::trace;

type Handler<T> = Box<dyn FnMut(&T)>;

struct Slot<T> {
    id: u64,
    one_shot: bool,
    dead: bool,
    handler: Option<Handler<T>>,
}

struct Inner<T> {
    slots: RefCell<Vec<Slot<T>>>,
    next_id: Cell<u64>,
    depth: Cell<usize>,
}

trait Disconnectable {
    fn tombstone(&self, id: u64);
}

impl<T: 'static> Inner<T> {
    /// Moves dead slots out so their handlers drop after the borrow is
    /// released; a handler's drop may touch this event again.
    fn sweep(&self) -> Vec<Slot<T>> {
        let mut slots = self.slots.borrow_mut();
        let (dead, live): (Vec<_>, Vec<_>) = slots.drain(..).partition(|slot| slot.dead);
        *slots = live;
        dead
    }
}

impl<T: 'static> Disconnectable for Inner<T> {
    fn tombstone(&self, id: u64) {
        let taken = {
            let mut slots = self.slots.borrow_mut();
            let Some(slot) = slots.iter_mut().find(|slot| slot.id == id) else {
                return;
            };
            slot.dead = true;
            // The handler may currently be running (taken out by the
            // dispatch loop); whoever holds it drops it afterwards.
            slot.handler.take()
        };
        let swept = if self.depth.get() == 0 {
            self.sweep()
        } else {
            Vec::new()
        };
        drop(taken);
        drop(swept);
    }
}

/// Handle to one subscription. Disconnecting is idempotent; a handle whose
/// event is gone disconnects into the void.
#[derive(Clone)]
pub struct EventConnection {
    target: Weak<dyn Disconnectable>,
    id: u64,
}

impl EventConnection {
    pub fn disconnect(&self) {
        if let Some(target) = self.target.upgrade() {
            target.tombstone(self.id);
        }
    }
}

/// Holds a connection and disconnects it on drop.
#[derive(Default)]
pub struct EventScope {
    connection: Option<EventConnection>,
}

impl EventScope {
    pub fn new(connection: EventConnection) -> Self {
        EventScope {
            connection: Some(connection),
        }
    }

    /// Replaces the held connection, disconnecting the previous one.
    pub fn set(&mut self, connection: EventConnection) {
        self.clear();
        self.connection = Some(connection);
    }

    /// Disconnects and empties the scope.
    pub fn clear(&mut self) {
        if let Some(connection) = self.connection.take() {
            connection.disconnect();
        }
    }

    /// Yields the connection without disconnecting it.
    pub fn release(&mut self) -> Option<EventConnection> {
        self.connection.take()
    }

    pub fn is_engaged(&self) -> bool {
        self.connection.is_some()
    }
}

impl Drop for EventScope {
    fn drop(&mut self) {
        self.clear();
    }
}

impl From<EventConnection> for EventScope {
    fn from(connection: EventConnection) -> Self {
        EventScope::new(connection)
    }
}

/// A broadcast point. Cloning yields another handle to the same handler
/// list, so owners can hand the event out by value.
pub struct Event<T> {
    inner: Rc<Inner<T>>,
}

impl<T> Clone for Event<T> {
    fn clone(&self) -> Self {
        Event {
            inner: Rc::clone(&self.inner),
        }
    }
}

impl<T: 'static> Default for Event<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: 'static> Event<T> {
    pub fn new() -> Self {
        Event {
            inner: Rc::new(Inner {
                slots: RefCell::new(Vec::new()),
                next_id: Cell::new(0),
                depth: Cell::new(0),
            }),
        }
    }

    fn push(&self, handler: Handler<T>, one_shot: bool) -> EventConnection {
        let id = self.inner.next_id.get();
        self.inner.next_id.set(id + 1);
        self.inner.slots.borrow_mut().push(Slot {
            id,
            one_shot,
            dead: false,
            handler: Some(handler),
        });
        EventConnection {
            target: Rc::downgrade(&self.inner) as Weak<dyn Disconnectable>,
            id,
        }
    }

    /// Appends a handler; it stays subscribed until disconnected.
    pub fn subscribe(&self, handler: impl FnMut(&T) + 'static) -> EventConnection {
        self.push(Box::new(handler), false)
    }

    /// Appends a handler that disconnects itself before its first (and
    /// only) invocation.
    pub fn subscribe_once(&self, handler: impl FnMut(&T) + 'static) -> EventConnection {
        self.push(Box::new(handler), true)
    }

    /// Appends a handler that receives its own connection, enabling
    /// conditional self-disconnect.
    pub fn subscribe_extended(
        &self,
        mut handler: impl FnMut(&EventConnection, &T) + 'static,
    ) -> EventConnection {
        let id = self.inner.next_id.get();
        let connection = EventConnection {
            target: Rc::downgrade(&self.inner) as Weak<dyn Disconnectable>,
            id,
        };
        let own = connection.clone();
        self.push(Box::new(move |args: &T| handler(&own, args)), false);
        connection
    }

    /// Invokes every live handler in registration order. Handlers
    /// subscribed during the dispatch run from the next dispatch on.
    pub fn fire(&self, args: &T) {
        let count = self.inner.slots.borrow().len();
        self.inner.depth.set(self.inner.depth.get() + 1);
        for index in 0..count {
            let taken = {
                let mut slots = self.inner.slots.borrow_mut();
                match slots.get_mut(index) {
                    Some(slot) if !slot.dead => {
                        if slot.one_shot {
                            slot.dead = true;
                        }
                        slot.handler.take().map(|handler| (slot.id, handler))
                    }
                    _ => None,
                }
            };
            let Some((id, mut handler)) = taken else {
                continue;
            };
            handler(args);
            let mut slots = self.inner.slots.borrow_mut();
            if let Some(slot) = slots.iter_mut().find(|slot| slot.id == id) {
                if !slot.dead {
                    slot.handler = Some(handler);
                }
            }
        }
        let depth = self.inner.depth.get() - 1;
        self.inner.depth.set(depth);
        if depth == 0 {
            let swept = self.inner.sweep();
            if !swept.is_empty() {
                trace!(target: "events", removed = swept.len(), "swept dead handlers");
            }
        }
    }

    /// Number of live subscriptions.
    pub fn handler_count(&self) -> usize {
        self.inner
            .slots
            .borrow()
            .iter()
            .filter(|slot| !slot.dead)
            .count()
    }
}
