//! Activators that produce the runtime instance behind a descriptor.
use std::cell::RefCell;
use std::sync::Arc;

use once_cell::sync::OnceCell;

use crate::extensibility::error::{ExtensibilityError, Result};
use crate::extensibility::object::Object;
use crate::extensibility::object_factory::ObjectFactory;
use crate::extensibility::property_set::PropertySet;
use crate::extensibility::resolver::ObjectDependencyResolver;
use crate::extensibility::types::{TypeInfo, TypeName};

pub trait Handler: Send + Sync {
    /// Returns the instance, creating it if needed.
    fn activate(&self) -> Result<Object>;
}

pub trait HandlerFactory: Send + Sync {
    /// Creates a handler producing instances of `object_type` viewed as
    /// `contract_type`.
    fn create_handler(
        &self,
        resolver: Arc<dyn ObjectDependencyResolver>,
        contract_type: &TypeName,
        object_type: Arc<TypeInfo>,
        properties: &PropertySet,
    ) -> Result<Arc<dyn Handler>>;
}

/// Creates one lazily constructed instance per handler.
#[derive(Debug, Default, Clone, Copy)]
pub struct SingletonHandlerFactory;

impl HandlerFactory for SingletonHandlerFactory {
    fn create_handler(
        &self,
        resolver: Arc<dyn ObjectDependencyResolver>,
        contract_type: &TypeName,
        object_type: Arc<TypeInfo>,
        properties: &PropertySet,
    ) -> Result<Arc<dyn Handler>> {
        if !object_type.is_assignable_to(contract_type) {
            return Err(ExtensibilityError::construction(format!(
                "Type '{}' does not implement contract '{}'.",
                object_type.name(),
                contract_type
            )));
        }
        Ok(Arc::new(SingletonHandler {
            contract_type: contract_type.clone(),
            factory: ObjectFactory::new(resolver, object_type, properties.clone()),
            instance: OnceCell::new(),
        }))
    }
}

pub struct SingletonHandler {
    contract_type: TypeName,
    factory: ObjectFactory,
    instance: OnceCell<Object>,
}

impl Handler for SingletonHandler {
    fn activate(&self) -> Result<Object> {
        if let Some(instance) = self.instance.get() {
            return Ok(instance.clone());
        }
        let _guard = ActivationGuard::enter(self as *const Self as usize).ok_or_else(|| {
            ExtensibilityError::construction(format!(
                "Detected a circular dependency while activating an instance of type '{}'.",
                self.factory.object_type().name()
            ))
        })?;
        self.instance
            .get_or_try_init(|| {
                let object = self.factory.create_instance()?;
                object.cast_to(&self.contract_type).ok_or_else(|| {
                    ExtensibilityError::construction(format!(
                        "Type '{}' does not implement contract '{}'.",
                        object.type_name(),
                        self.contract_type
                    ))
                })
            })
            .cloned()
    }
}

/// Hands out a pre-built instance, ignoring the requested types.
#[derive(Clone)]
pub struct InstanceHandlerFactory {
    instance: Object,
}

impl InstanceHandlerFactory {
    pub fn new(instance: Object) -> Self {
        InstanceHandlerFactory { instance }
    }
}

impl HandlerFactory for InstanceHandlerFactory {
    fn create_handler(
        &self,
        _resolver: Arc<dyn ObjectDependencyResolver>,
        _contract_type: &TypeName,
        _object_type: Arc<TypeInfo>,
        _properties: &PropertySet,
    ) -> Result<Arc<dyn Handler>> {
        Ok(Arc::new(InstanceHandler {
            instance: self.instance.clone(),
        }))
    }
}

pub struct InstanceHandler {
    instance: Object,
}

impl Handler for InstanceHandler {
    fn activate(&self) -> Result<Object> {
        Ok(self.instance.clone())
    }
}

thread_local! {
    static ACTIVATION_STACK: RefCell<Vec<usize>> = const { RefCell::new(Vec::new()) };
}

/// Marks a handler as activating on the current thread.
struct ActivationGuard(usize);

impl ActivationGuard {
    fn enter(key: usize) -> Option<Self> {
        ACTIVATION_STACK.with(|stack| {
            let mut stack = stack.borrow_mut();
            if stack.contains(&key) {
                None
            } else {
                stack.push(key);
                Some(ActivationGuard(key))
            }
        })
    }
}

impl Drop for ActivationGuard {
    fn drop(&mut self) {
        ACTIVATION_STACK.with(|stack| {
            let mut stack = stack.borrow_mut();
            if let Some(position) = stack.iter().rposition(|key| *key == self.0) {
                stack.remove(position);
            }
        });
    }
}
