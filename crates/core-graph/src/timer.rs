use std::cell::Cell;
use std::time::Duration;

use core_events::EventScope;

use crate::PollEvent;

/// One-shot countdown driven by the poll event: every tick subtracts the
/// elapsed duration, and the handler runs once the remainder is used up.
/// Dropping the timer cancels it.
pub struct Timer {
    scope: EventScope,
}

impl Timer {
    pub fn new(poll_event: &PollEvent, timeout: Duration, handler: impl FnOnce() + 'static) -> Timer {
        let remaining = Cell::new(timeout);
        let mut handler = Some(handler);
        let connection = poll_event.subscribe_extended(move |connection, elapsed: &Duration| {
            if *elapsed < remaining.get() {
                remaining.set(remaining.get() - *elapsed);
                return;
            }
            connection.disconnect();
            if let Some(handler) = handler.take() {
                handler();
            }
        });
        Timer {
            scope: EventScope::new(connection),
        }
    }

    /// Whether the timer is still armed.
    pub fn pending(&self) -> bool {
        self.scope.is_engaged()
    }
}
