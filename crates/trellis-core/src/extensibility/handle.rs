use std::fmt;
use std::sync::Arc;

use crate::extensibility::descriptor::ComponentDescriptor;
use crate::extensibility::error::Result;
use crate::extensibility::object::{Object, Value};
use crate::extensibility::types::TypeName;

/// A reference to a component that resolves its instance and traits on
/// demand.
#[derive(Clone)]
pub struct ComponentHandle {
    descriptor: Arc<ComponentDescriptor>,
}

impl ComponentHandle {
    pub fn new(descriptor: Arc<ComponentDescriptor>) -> Self {
        ComponentHandle { descriptor }
    }

    pub fn id(&self) -> &str {
        self.descriptor.component_id()
    }

    pub fn descriptor(&self) -> &Arc<ComponentDescriptor> {
        &self.descriptor
    }

    pub fn service_type_name(&self) -> &TypeName {
        self.descriptor.service().service_type_name()
    }

    pub fn get_component(&self) -> Result<Object> {
        self.descriptor.resolve_component()
    }

    pub fn get_component_as<C: ?Sized + 'static>(&self) -> Result<Arc<C>> {
        Value::Object(self.get_component()?).into_service::<C>()
    }

    pub fn get_traits(&self) -> Result<Object> {
        self.descriptor.resolve_traits()
    }

    pub fn get_traits_as<T: ?Sized + 'static>(&self) -> Result<Arc<T>> {
        Value::Object(self.get_traits()?).into_service::<T>()
    }
}

impl fmt::Debug for ComponentHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("ComponentHandle").field(&self.id()).finish()
    }
}
