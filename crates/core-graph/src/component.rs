use std::any::Any;
use std::fmt;
use std::rc::Rc;

use crate::input::Input;
use crate::output::Output;
use crate::process::HelperCommand;
use crate::transition::Transition;

/// The role a component type plays in the graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Category {
    Input,
    Output,
    Transition,
    Standalone,
}

impl Category {
    pub const ALL: [Category; 4] = [
        Category::Input,
        Category::Output,
        Category::Transition,
        Category::Standalone,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Category::Input => "input",
            Category::Output => "output",
            Category::Transition => "transition",
            Category::Standalone => "standalone",
        }
    }

    pub fn parse(text: &str) -> Option<Category> {
        Category::ALL
            .into_iter()
            .find(|category| category.as_str() == text)
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Identity of one component instance: registered `(category, name)` plus
/// the unique id.
#[derive(Debug, Clone)]
pub struct ComponentMeta {
    pub category: Category,
    pub name: &'static str,
    pub id: String,
}

impl ComponentMeta {
    pub fn new(category: Category, name: &'static str, id: String) -> Self {
        ComponentMeta { category, name, id }
    }

    /// Form used in error messages and logs.
    pub fn describe(&self) -> String {
        format!("{} {} \"{}\"", self.category, self.name, self.id)
    }
}

impl fmt::Display for ComponentMeta {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.describe())
    }
}

/// A node of the component graph. Concrete types opt into capabilities by
/// overriding the corresponding accessor; the dependency resolver turns a
/// failed cast into a startup error.
pub trait Component: 'static {
    fn meta(&self) -> &ComponentMeta;

    /// Concrete-type access for standalone collaborators (broker clients,
    /// hardware buses).
    fn as_any(self: Rc<Self>) -> Rc<dyn Any>;

    fn as_input(self: Rc<Self>) -> Option<Rc<dyn Input>> {
        None
    }

    fn as_output(self: Rc<Self>) -> Option<Rc<dyn Output>> {
        None
    }

    fn as_transition(self: Rc<Self>) -> Option<Rc<dyn Transition>> {
        None
    }

    /// Declared by components whose hardware lives in a helper child
    /// process; collected by the manager before the reactor loop starts.
    fn helper_process(&self) -> Option<HelperCommand> {
        None
    }
}
