use std::collections::HashMap;
use std::rc::Rc;

use crate::component::{Category, Component, ComponentMeta};
use crate::error::Error;
use crate::manager::Manager;
use core_properties::PropertyNode;

/// Constructor signature stored in the factory table. Receives the
/// manager (for dependency resolution), the stamped identity, and the
/// component's configuration node.
pub type Constructor =
    fn(&mut Manager, ComponentMeta, &PropertyNode<'_>) -> Result<Rc<dyn Component>, Error>;

const ID_SEED: u64 = 924536;

struct Entry {
    name: &'static str,
    constructor: Constructor,
}

/// Table of registered component types, keyed by `(category, name)`, plus
/// the generator for anonymous inline ids.
pub struct ComponentFactory {
    entries: HashMap<(Category, String), Entry>,
    generated_id: u64,
}

impl Default for ComponentFactory {
    fn default() -> Self {
        Self::new()
    }
}

impl ComponentFactory {
    pub fn new() -> Self {
        ComponentFactory {
            entries: HashMap::new(),
            generated_id: ID_SEED,
        }
    }

    /// Registers a constructor; a second registration of the same
    /// `(category, name)` is a startup error.
    pub fn register(
        &mut self,
        category: Category,
        name: &'static str,
        constructor: Constructor,
    ) -> Result<(), Error> {
        let entry = Entry { name, constructor };
        if self
            .entries
            .insert((category, name.to_owned()), entry)
            .is_some()
        {
            return Err(Error::DuplicateComponent { category, name });
        }
        Ok(())
    }

    /// Generates an id `"{type}.{n}"` for an anonymous inline component.
    /// The sequence walks `[100000, 999999]` without repeating for 900000
    /// draws, so generated ids stay non-consecutive and non-clashing.
    pub fn generate_id(&mut self, type_name: &str) -> String {
        let id = format!("{}.{}", type_name, self.generated_id);
        self.generated_id = (self.generated_id - 100_000 + 99_991) % 900_000 + 100_000;
        id
    }

    /// Resolves a configured type tag (either `name` or `category:name`)
    /// to its registration. Names may themselves contain a colon
    /// (`animate:waves`), so only a prefix that parses as a category makes
    /// the lookup qualified.
    pub fn resolve(
        &self,
        type_name: &str,
        id: &str,
    ) -> Result<(Category, &'static str, Constructor), Error> {
        if let Some((prefix, name)) = type_name.split_once(':') {
            if let Some(category) = Category::parse(prefix) {
                let entry = self
                    .entries
                    .get(&(category, name.to_owned()))
                    .map(|entry| (category, entry.name, entry.constructor));
                return entry.ok_or_else(|| Error::UnknownType {
                    type_name: type_name.into(),
                    id: id.into(),
                });
            }
        }

        let mut matches = Category::ALL.into_iter().filter_map(|category| {
            self.entries
                .get(&(category, type_name.to_owned()))
                .map(|entry| (category, entry.name, entry.constructor))
        });
        match (matches.next(), matches.next()) {
            (Some(entry), None) => Ok(entry),
            (Some(_), Some(_)) => Err(Error::AmbiguousType {
                type_name: type_name.into(),
                id: id.into(),
            }),
            (None, _) => Err(Error::UnknownType {
                type_name: type_name.into(),
                id: id.into(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn noop_constructor(
        _manager: &mut Manager,
        _meta: ComponentMeta,
        _properties: &PropertyNode<'_>,
    ) -> Result<Rc<dyn Component>, Error> {
        unreachable!("never constructed in these tests")
    }

    #[test]
    fn generated_ids_follow_the_documented_sequence() {
        let mut factory = ComponentFactory::new();
        assert_eq!(factory.generate_id("fade"), "fade.924536");
        assert_eq!(factory.generate_id("fade"), "fade.124527");
        assert_eq!(factory.generate_id("shift"), "shift.224518");
    }

    #[test]
    fn generated_ids_do_not_clash_within_the_cycle() {
        let mut factory = ComponentFactory::new();
        let mut seen = std::collections::HashSet::new();
        for _ in 0..900_000 {
            assert!(seen.insert(factory.generate_id("x")));
        }
    }

    #[test]
    fn duplicate_registration_fails() {
        let mut factory = ComponentFactory::new();
        factory
            .register(Category::Input, "gpio", noop_constructor)
            .unwrap();
        assert!(matches!(
            factory.register(Category::Input, "gpio", noop_constructor),
            Err(Error::DuplicateComponent { .. })
        ));
        // Same name under another category is a distinct type.
        factory
            .register(Category::Output, "gpio", noop_constructor)
            .unwrap();
    }

    #[test]
    fn qualified_and_unqualified_lookup() {
        let mut factory = ComponentFactory::new();
        factory
            .register(Category::Input, "gpio", noop_constructor)
            .unwrap();
        factory
            .register(Category::Transition, "fade", noop_constructor)
            .unwrap();

        let (category, name, _) = factory.resolve("fade", "x").unwrap();
        assert_eq!((category, name), (Category::Transition, "fade"));
        let (category, _, _) = factory.resolve("input:gpio", "x").unwrap();
        assert_eq!(category, Category::Input);
    }

    #[test]
    fn ambiguous_unqualified_lookup_fails() {
        let mut factory = ComponentFactory::new();
        factory
            .register(Category::Input, "mqtt", noop_constructor)
            .unwrap();
        factory
            .register(Category::Output, "mqtt", noop_constructor)
            .unwrap();
        assert!(matches!(
            factory.resolve("mqtt", "x"),
            Err(Error::AmbiguousType { .. })
        ));
        assert!(factory.resolve("output:mqtt", "x").is_ok());
    }

    #[test]
    fn names_containing_a_colon_resolve_both_ways() {
        let mut factory = ComponentFactory::new();
        factory
            .register(Category::Transition, "animate:waves", noop_constructor)
            .unwrap();
        let (category, name, _) = factory.resolve("animate:waves", "x").unwrap();
        assert_eq!((category, name), (Category::Transition, "animate:waves"));
        let (category, name, _) = factory.resolve("transition:animate:waves", "x").unwrap();
        assert_eq!((category, name), (Category::Transition, "animate:waves"));
    }

    #[test]
    fn unknown_types_fail() {
        let factory = ComponentFactory::new();
        assert!(matches!(
            factory.resolve("nosuch", "x"),
            Err(Error::UnknownType { .. })
        ));
        assert!(matches!(
            factory.resolve("bogus:fade", "x"),
            Err(Error::UnknownType { .. })
        ));
    }
}
