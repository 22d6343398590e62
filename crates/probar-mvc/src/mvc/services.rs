//! Service registrations and the per-request service scope.

use crate::reflection::names::friendly_type_name;
use crate::reflection::{Constructor, DependencyResolver};
use std::any::{Any, TypeId};
use std::cell::RefCell;
use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;

/// How long a registered service instance lives
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServiceLifetime {
    /// One instance, cloned out on every resolution
    Singleton,
    /// A new instance on every resolution
    Transient,
}

#[derive(Clone)]
struct ServiceDescriptor {
    type_name: String,
    lifetime: ServiceLifetime,
    factory: Rc<dyn Fn() -> Box<dyn Any>>,
}

/// Registered services keyed by type.
#[derive(Clone, Default)]
pub struct ServiceProvider {
    services: HashMap<TypeId, ServiceDescriptor>,
}

impl ServiceProvider {
    /// Empty provider
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a singleton; later registrations replace earlier ones
    pub fn add_singleton<T: Clone + 'static>(&mut self, value: T) -> &mut Self {
        self.insert::<T>(ServiceLifetime::Singleton, Rc::new(move || Box::new(value.clone())));
        self
    }

    /// Register a transient factory
    pub fn add_transient<T, F>(&mut self, factory: F) -> &mut Self
    where
        T: 'static,
        F: Fn() -> T + 'static,
    {
        self.insert::<T>(ServiceLifetime::Transient, Rc::new(move || Box::new(factory())));
        self
    }

    fn insert<T: 'static>(&mut self, lifetime: ServiceLifetime, factory: Rc<dyn Fn() -> Box<dyn Any>>) {
        self.services.insert(
            TypeId::of::<T>(),
            ServiceDescriptor {
                type_name: friendly_type_name::<T>(),
                lifetime,
                factory,
            },
        );
    }

    /// Resolve a service
    #[must_use]
    pub fn get<T: 'static>(&self) -> Option<T> {
        (self as &dyn DependencyResolver).resolve::<T>()
    }

    /// Whether `T` is registered
    #[must_use]
    pub fn contains<T: 'static>(&self) -> bool {
        self.services.contains_key(&TypeId::of::<T>())
    }

    /// Lifetime of a registration
    #[must_use]
    pub fn lifetime_of<T: 'static>(&self) -> Option<ServiceLifetime> {
        self.services.get(&TypeId::of::<T>()).map(|service| service.lifetime)
    }

    /// Number of registrations
    #[must_use]
    pub fn len(&self) -> usize {
        self.services.len()
    }

    /// Whether nothing is registered
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.services.is_empty()
    }

    /// Copy registrations from `other`, replacing duplicates
    pub fn extend_from(&mut self, other: &Self) {
        for (type_id, service) in &other.services {
            self.services.insert(*type_id, service.clone());
        }
    }

    /// Build with the longest constructor whose required parameters all resolve.
    #[must_use]
    pub fn construct<T>(&self, constructors: &[Constructor<T>]) -> Option<T> {
        let mut candidates: Vec<&Constructor<T>> = constructors
            .iter()
            .filter(|constructor| constructor.resolvable_by(self))
            .collect();
        candidates.sort_by_key(|constructor| std::cmp::Reverse(constructor.arity()));
        candidates
            .into_iter()
            .find_map(|constructor| constructor.invoke(self))
    }

    fn factory_for(&self, type_id: TypeId) -> Option<Rc<dyn Fn() -> Box<dyn Any>>> {
        self.services.get(&type_id).map(|service| Rc::clone(&service.factory))
    }

    /// Friendly names of the required parameters `self` cannot resolve
    #[must_use]
    pub fn missing_for<T>(&self, constructor: &Constructor<T>) -> Vec<String> {
        constructor
            .parameters()
            .iter()
            .filter(|parameter| !parameter.optional && !DependencyResolver::contains(self, parameter.type_id))
            .map(|parameter| parameter.friendly_name())
            .collect()
    }
}

impl DependencyResolver for ServiceProvider {
    fn resolve_erased(&self, type_id: TypeId) -> Option<Option<Box<dyn Any>>> {
        self.services
            .get(&type_id)
            .map(|service| Some((service.factory)()))
    }

    fn contains(&self, type_id: TypeId) -> bool {
        self.services.contains_key(&type_id)
    }
}

impl fmt::Debug for ServiceProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut names: Vec<&str> = self.services.values().map(|service| service.type_name.as_str()).collect();
        names.sort_unstable();
        f.debug_struct("ServiceProvider").field("services", &names).finish()
    }
}

thread_local! {
    static REQUEST_SERVICES: RefCell<Vec<ServiceProvider>> = const { RefCell::new(Vec::new()) };
}

/// Services of the request currently being prepared or invoked.
#[derive(Debug)]
pub struct RequestServices;

impl RequestServices {
    /// Make `services` the current request services until the guard drops
    #[must_use = "the scope ends when the guard is dropped"]
    pub fn enter(services: ServiceProvider) -> RequestServicesGuard {
        REQUEST_SERVICES.with(|stack| stack.borrow_mut().push(services));
        RequestServicesGuard { _private: () }
    }

    /// Resolve from the innermost active scope.
    ///
    /// The factory runs after the scope stack is released, so it may itself
    /// resolve services or enter a nested scope.
    #[must_use]
    pub fn resolve<T: 'static>() -> Option<T> {
        let factory = REQUEST_SERVICES.with(|stack| {
            stack
                .borrow()
                .last()
                .and_then(|services| services.factory_for(TypeId::of::<T>()))
        })?;
        factory().downcast::<T>().ok().map(|value| *value)
    }

    /// Whether a scope is active
    #[must_use]
    pub fn is_active() -> bool {
        REQUEST_SERVICES.with(|stack| !stack.borrow().is_empty())
    }
}

/// Ends a request services scope on drop
#[derive(Debug)]
pub struct RequestServicesGuard {
    _private: (),
}

impl Drop for RequestServicesGuard {
    fn drop(&mut self) {
        REQUEST_SERVICES.with(|stack| {
            stack.borrow_mut().pop();
        });
    }
}
