use std::cell::RefCell;
use std::rc::Rc;

use thiserror::Error;

use core_expression::ExpressionError;
use core_properties::PropertyError;

use crate::component::Category;

#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Property(#[from] PropertyError),
    #[error(transparent)]
    Expression(#[from] ExpressionError),
    #[error("duplicate registration for component type \"{category}:{name}\"")]
    DuplicateComponent {
        category: Category,
        name: &'static str,
    },
    #[error("unable to create component \"{id}\": type \"{type_name}\" is not registered")]
    UnknownType { type_name: String, id: String },
    #[error("unable to create component \"{id}\": type \"{type_name}\" matches more than one category")]
    AmbiguousType { type_name: String, id: String },
    #[error("unable to create component \"{id}\": another component with the same id exists")]
    DuplicateId { id: String },
    #[error("component \"{requester}\" depends on unknown component \"{id}\"")]
    UnknownDependency { requester: String, id: String },
    #[error("component \"{requester}\" depends on component \"{id}\" which is not a {expected}")]
    WrongDependencyType {
        requester: String,
        id: String,
        expected: &'static str,
    },
    #[error("invalid connection between {sender} and {receiver}: receiver doesn't accept {channels} channels")]
    ChannelCountMismatch {
        sender: String,
        receiver: String,
        channels: usize,
    },
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Sink for failures raised from ready-event handlers, which cannot
/// propagate a `Result` themselves. The manager drains it right after
/// firing `ready` and aborts startup on the first entry.
#[derive(Clone, Default)]
pub struct StartupErrors {
    errors: Rc<RefCell<Vec<Error>>>,
}

impl StartupErrors {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn report(&self, error: Error) {
        self.errors.borrow_mut().push(error);
    }

    pub fn take_first(&self) -> Option<Error> {
        let mut errors = self.errors.borrow_mut();
        if errors.is_empty() {
            None
        } else {
            Some(errors.remove(0))
        }
    }
}
