//! Best-effort instance construction.
//!
//! A type describes how it can be built as a list of [`Constructor`]s. Given
//! an ordered bag of dependency values, [`create_instance`] first tries the
//! constructor whose parameters match the bag position by position, then
//! falls back to an order-independent search.

use super::names::friendly_type_name;
use std::any::{Any, TypeId};
use std::fmt;

/// A constructor parameter
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParameterInfo {
    /// Identity of the parameter type (the inner type for optional parameters)
    pub type_id: TypeId,
    /// Compiler name of the parameter type
    pub type_name: &'static str,
    /// Whether the parameter is an `Option` that accepts an absent value
    pub optional: bool,
}

impl ParameterInfo {
    /// Required parameter of type `T`
    #[must_use]
    pub fn of<T: 'static>() -> Self {
        Self {
            type_id: TypeId::of::<T>(),
            type_name: std::any::type_name::<T>(),
            optional: false,
        }
    }

    /// Optional parameter (`Option<T>`)
    #[must_use]
    pub fn optional<T: 'static>() -> Self {
        Self {
            optional: true,
            ..Self::of::<T>()
        }
    }

    /// Friendly type name
    #[must_use]
    pub fn friendly_name(&self) -> String {
        super::prettify_type_name(self.type_name)
    }
}

/// Source of constructor arguments.
pub trait DependencyResolver {
    /// `Some(Some(value))` when resolved, `Some(None)` when explicitly
    /// absent, `None` when the resolver knows nothing about the type.
    fn resolve_erased(&self, type_id: TypeId) -> Option<Option<Box<dyn Any>>>;

    /// Whether the resolver has an entry (possibly absent) for the type
    fn contains(&self, type_id: TypeId) -> bool;
}

impl dyn DependencyResolver + '_ {
    /// Resolve a required dependency
    pub fn resolve<T: 'static>(&self) -> Option<T> {
        self.resolve_erased(TypeId::of::<T>())
            .flatten()
            .and_then(|value| value.downcast::<T>().ok())
            .map(|value| *value)
    }

    /// Resolve an optional dependency; unknown and absent both yield `None`
    pub fn resolve_optional<T: 'static>(&self) -> Option<T> {
        self.resolve::<T>()
    }
}

/// A way to build `T` from resolved dependencies.
pub struct Constructor<T> {
    parameters: Vec<ParameterInfo>,
    build: fn(&dyn DependencyResolver) -> Option<T>,
}

impl<T> Constructor<T> {
    /// Create a constructor descriptor
    #[must_use]
    pub fn new(parameters: Vec<ParameterInfo>, build: fn(&dyn DependencyResolver) -> Option<T>) -> Self {
        Self { parameters, build }
    }

    /// Parameters in declaration order
    #[must_use]
    pub fn parameters(&self) -> &[ParameterInfo] {
        &self.parameters
    }

    /// Number of parameters
    #[must_use]
    pub fn arity(&self) -> usize {
        self.parameters.len()
    }

    /// Build an instance; `None` when a required argument is missing
    #[must_use]
    pub fn invoke(&self, resolver: &dyn DependencyResolver) -> Option<T> {
        (self.build)(resolver)
    }

    /// Parameter types match the bag entries one to one, in order.
    #[must_use]
    pub fn accepts_positionally(&self, bag: &DependencyBag) -> bool {
        self.parameters.len() == bag.len()
            && self
                .parameters
                .iter()
                .zip(&bag.entries)
                .all(|(parameter, entry)| parameter.type_id == entry.type_id)
    }

    /// Parameter types match the bag entries one to one, in any order.
    #[must_use]
    pub fn accepts(&self, bag: &DependencyBag) -> bool {
        if self.parameters.len() != bag.len() {
            return false;
        }
        let mut remaining: Vec<TypeId> = bag.type_ids().collect();
        self.parameters.iter().all(|parameter| {
            remaining
                .iter()
                .position(|type_id| *type_id == parameter.type_id)
                .map(|index| remaining.swap_remove(index))
                .is_some()
        })
    }

    /// Every required parameter can be resolved.
    #[must_use]
    pub fn resolvable_by(&self, resolver: &dyn DependencyResolver) -> bool {
        self.parameters
            .iter()
            .all(|parameter| parameter.optional || resolver.contains(parameter.type_id))
    }
}

impl<T> fmt::Debug for Constructor<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names: Vec<String> = self.parameters.iter().map(ParameterInfo::friendly_name).collect();
        write!(f, "Constructor({})", names.join(", "))
    }
}

trait CloneAny {
    fn clone_boxed(&self) -> Box<dyn Any>;
}

impl<T: Clone + 'static> CloneAny for T {
    fn clone_boxed(&self) -> Box<dyn Any> {
        Box::new(self.clone())
    }
}

struct BagEntry {
    type_id: TypeId,
    type_name: String,
    value: Option<Box<dyn CloneAny>>,
}

/// Ordered set of explicitly registered dependencies, one per type.
///
/// An entry without a value stands for a dependency the test registered as
/// absent.
#[derive(Default)]
pub struct DependencyBag {
    entries: Vec<BagEntry>,
}

impl DependencyBag {
    /// Empty bag
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a value; `false` when the type is already registered.
    pub fn try_insert<T: Clone + 'static>(&mut self, value: T) -> bool {
        self.try_insert_entry::<T>(Some(Box::new(value)))
    }

    /// Register `T` as explicitly absent; `false` when already registered.
    pub fn try_insert_absent<T: 'static>(&mut self) -> bool {
        self.try_insert_entry::<T>(None)
    }

    fn try_insert_entry<T: 'static>(&mut self, value: Option<Box<dyn CloneAny>>) -> bool {
        let type_id = TypeId::of::<T>();
        if self.contains(type_id) {
            return false;
        }
        self.entries.push(BagEntry {
            type_id,
            type_name: friendly_type_name::<T>(),
            value,
        });
        true
    }

    /// Number of registered dependencies
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether nothing is registered
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Registered type identities, in registration order
    pub fn type_ids(&self) -> impl Iterator<Item = TypeId> + '_ {
        self.entries.iter().map(|entry| entry.type_id)
    }

    /// Friendly names of registered types, in registration order
    #[must_use]
    pub fn type_names(&self) -> Vec<String> {
        self.entries.iter().map(|entry| entry.type_name.clone()).collect()
    }

    /// Clone of the value registered for `T`
    #[must_use]
    pub fn get<T: 'static>(&self) -> Option<T> {
        (self as &dyn DependencyResolver).resolve::<T>()
    }
}

impl DependencyResolver for DependencyBag {
    fn resolve_erased(&self, type_id: TypeId) -> Option<Option<Box<dyn Any>>> {
        self.entries
            .iter()
            .find(|entry| entry.type_id == type_id)
            .map(|entry| entry.value.as_ref().map(|value| (**value).clone_boxed()))
    }

    fn contains(&self, type_id: TypeId) -> bool {
        self.entries.iter().any(|entry| entry.type_id == type_id)
    }
}

impl fmt::Debug for DependencyBag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list()
            .entries(self.entries.iter().map(|entry| {
                if entry.value.is_some() {
                    entry.type_name.clone()
                } else {
                    format!("{} (absent)", entry.type_name)
                }
            }))
            .finish()
    }
}

/// Best-match constructor for an unordered set of dependencies.
///
/// A type with exactly one constructor always selects it. Otherwise the first
/// constructor whose parameter types equal the bag's types (in any order)
/// wins.
#[must_use]
pub fn find_constructor<'c, T>(constructors: &'c [Constructor<T>], bag: &DependencyBag) -> Option<&'c Constructor<T>> {
    match constructors {
        [only] => Some(only),
        _ => constructors.iter().find(|constructor| constructor.accepts(bag)),
    }
}

/// Build an instance from explicitly registered dependencies.
#[must_use]
pub fn create_instance<T>(constructors: &[Constructor<T>], bag: &DependencyBag) -> Option<T> {
    constructors
        .iter()
        .find(|constructor| constructor.accepts_positionally(bag))
        .and_then(|constructor| constructor.invoke(bag))
        .or_else(|| find_constructor(constructors, bag).and_then(|constructor| constructor.invoke(bag)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone, PartialEq)]
    struct Repository(String);

    #[derive(Debug, Clone, PartialEq)]
    struct Clock(u64);

    #[derive(Debug, PartialEq)]
    enum Built {
        Empty,
        WithRepository(Repository),
        WithBoth(Repository, Clock),
        WithOptionalClock(Option<Clock>),
    }

    fn multiple() -> Vec<Constructor<Built>> {
        vec![
            Constructor::new(vec![], |_| Some(Built::Empty)),
            Constructor::new(vec![ParameterInfo::of::<Repository>()], |resolver| {
                Some(Built::WithRepository(resolver.resolve()?))
            }),
            Constructor::new(
                vec![ParameterInfo::of::<Repository>(), ParameterInfo::of::<Clock>()],
                |resolver| Some(Built::WithBoth(resolver.resolve()?, resolver.resolve()?)),
            ),
        ]
    }

    mod bag {
        use super::*;

        #[test]
        fn test_duplicate_rejected() {
            let mut bag = DependencyBag::new();
            assert!(bag.try_insert(Repository("a".into())));
            assert!(!bag.try_insert(Repository("b".into())));
            assert!(!bag.try_insert_absent::<Repository>());
            assert_eq!(bag.len(), 1);
            assert_eq!(bag.get::<Repository>(), Some(Repository("a".into())));
        }

        #[test]
        fn test_absent_entry() {
            let mut bag = DependencyBag::new();
            assert!(bag.try_insert_absent::<Clock>());
            assert!(bag.contains(TypeId::of::<Clock>()));
            assert_eq!(bag.get::<Clock>(), None);
            assert_eq!(bag.type_names(), ["Clock"]);
        }

        #[test]
        fn test_resolve_clones_the_registered_value() {
            let mut bag = DependencyBag::new();
            bag.try_insert(Repository("db".into()));
            let resolved = bag.resolve_erased(TypeId::of::<Repository>()).flatten().unwrap();
            assert_eq!(resolved.downcast_ref::<Repository>(), Some(&Repository("db".into())));
            assert_eq!(bag.get::<Repository>(), Some(Repository("db".into())));
            assert_eq!(bag.get::<Repository>(), Some(Repository("db".into())));
        }
    }

    mod selection {
        use super::*;

        #[test]
        fn test_sole_constructor_always_selected() {
            let constructors = vec![Constructor::new(vec![ParameterInfo::optional::<Clock>()], |resolver| {
                Some(Built::WithOptionalClock(resolver.resolve_optional()))
            })];
            let mut bag = DependencyBag::new();
            assert!(find_constructor(&constructors, &bag).is_some());
            bag.try_insert(Repository("unused".into()));
            assert!(find_constructor(&constructors, &bag).is_some());
            assert_eq!(create_instance(&constructors, &bag), Some(Built::WithOptionalClock(None)));
        }

        #[test]
        fn test_order_independent_match() {
            let mut bag = DependencyBag::new();
            bag.try_insert(Clock(7));
            bag.try_insert(Repository("db".into()));
            let constructors = multiple();
            let selected = find_constructor(&constructors, &bag).unwrap();
            assert_eq!(selected.arity(), 2);
            assert_eq!(
                create_instance(&constructors, &bag),
                Some(Built::WithBoth(Repository("db".into()), Clock(7)))
            );
        }

        #[test]
        fn test_positional_match_first() {
            let mut bag = DependencyBag::new();
            bag.try_insert(Repository("db".into()));
            assert_eq!(
                create_instance(&multiple(), &bag),
                Some(Built::WithRepository(Repository("db".into())))
            );
        }

        #[test]
        fn test_unmatched_bag_yields_none() {
            let mut bag = DependencyBag::new();
            bag.try_insert(Clock(1));
            assert!(find_constructor(&multiple(), &bag).is_none());
            assert!(create_instance(&multiple(), &bag).is_none());
        }

        #[test]
        fn test_absent_required_dependency_fails_build() {
            let mut bag = DependencyBag::new();
            bag.try_insert_absent::<Repository>();
            assert!(create_instance(&multiple(), &bag).is_none());
        }

        #[test]
        fn test_resolvable_by() {
            let constructors = multiple();
            let mut bag = DependencyBag::new();
            bag.try_insert(Repository("db".into()));
            assert!(constructors[1].resolvable_by(&bag));
            assert!(!constructors[2].resolvable_by(&bag));
        }
    }
}
