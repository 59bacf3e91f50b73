//! Type-erased instances and injectable values.
use std::any::Any;
use std::collections::HashMap;
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

use semver::Version;

use crate::extensibility::descriptor::{ComponentDescriptor, PluginDescriptor};
use crate::extensibility::error::{ExtensibilityError, Result};
use crate::extensibility::handle::ComponentHandle;
use crate::extensibility::types::{TypeInfo, TypeName};

#[derive(Clone)]
struct Origin {
    info: Arc<TypeInfo>,
    instance: Arc<dyn Any + Send + Sync>,
}

/// A shared instance viewed as a particular type.
///
/// Objects built by the object factory remember their concrete type, so
/// they can be re-viewed as any contract that type implements. Each view
/// stores an `Arc<X>` where `X` is the viewed type, usually a trait object.
#[derive(Clone)]
pub struct Object {
    type_name: TypeName,
    view: Arc<dyn Any + Send + Sync>,
    origin: Option<Origin>,
}

impl Object {
    /// Wraps a pre-built instance viewed as `type_name`.
    pub fn from_instance<X: ?Sized + Send + Sync + 'static>(
        type_name: impl Into<TypeName>,
        instance: Arc<X>,
    ) -> Self {
        Object {
            type_name: type_name.into(),
            view: Arc::new(instance),
            origin: None,
        }
    }

    pub(crate) fn from_concrete(info: Arc<TypeInfo>, instance: Arc<dyn Any + Send + Sync>) -> Self {
        Object {
            type_name: info.name().clone(),
            view: instance.clone(),
            origin: Some(Origin { info, instance }),
        }
    }

    /// The type this object is currently viewed as.
    pub fn type_name(&self) -> &TypeName {
        &self.type_name
    }

    /// The concrete type identifier, when known.
    pub fn concrete_type_name(&self) -> Option<&TypeName> {
        self.origin.as_ref().map(|origin| origin.info.name())
    }

    pub fn downcast<X: ?Sized + 'static>(&self) -> Option<Arc<X>> {
        (*self.view).downcast_ref::<Arc<X>>().cloned().or_else(|| {
            self.origin
                .as_ref()
                .and_then(|origin| (*origin.instance).downcast_ref::<Arc<X>>().cloned())
        })
    }

    pub fn is_assignable_to(&self, contract: &TypeName) -> bool {
        self.type_name.matches(contract)
            || self
                .origin
                .as_ref()
                .is_some_and(|origin| origin.info.is_assignable_to(contract))
    }

    /// Re-views this object as `contract`.
    pub fn cast_to(&self, contract: &TypeName) -> Option<Object> {
        if self.type_name.matches(contract) {
            return Some(self.clone());
        }
        let origin = self.origin.as_ref()?;
        let view = origin.info.as_concrete()?.cast(&*origin.instance, contract)?;
        Some(Object {
            type_name: contract.clone(),
            view,
            origin: Some(origin.clone()),
        })
    }

    /// True when both objects are views of the same underlying instance.
    pub fn same_instance(&self, other: &Object) -> bool {
        let root = |object: &Object| -> *const () {
            match &object.origin {
                Some(origin) => Arc::as_ptr(&origin.instance) as *const (),
                None => Arc::as_ptr(&object.view) as *const (),
            }
        };
        root(self) == root(other)
    }
}

impl fmt::Debug for Object {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Object")
            .field("type_name", &self.type_name)
            .field("concrete_type_name", &self.concrete_type_name())
            .finish()
    }
}

/// A resolved dependency value.
#[derive(Debug, Clone)]
pub enum Value {
    String(String),
    Bool(bool),
    Integer(i64),
    Unsigned(u64),
    Float(f64),
    Version(Version),
    Enum(String),
    Path(PathBuf),
    Object(Object),
    Handle(ComponentHandle),
    List(Vec<Value>),
    Plugin(Arc<PluginDescriptor>),
    Component(Arc<ComponentDescriptor>),
}

impl Value {
    fn kind_name(&self) -> &'static str {
        match self {
            Value::String(_) => "string",
            Value::Bool(_) => "boolean",
            Value::Integer(_) => "integer",
            Value::Unsigned(_) => "unsigned integer",
            Value::Float(_) => "float",
            Value::Version(_) => "version",
            Value::Enum(_) => "enumeration",
            Value::Path(_) => "path",
            Value::Object(_) => "object",
            Value::Handle(_) => "component handle",
            Value::List(_) => "list",
            Value::Plugin(_) => "plugin descriptor",
            Value::Component(_) => "component descriptor",
        }
    }

    fn mismatch(&self, expected: &str) -> ExtensibilityError {
        ExtensibilityError::construction(format!(
            "Expected a {} value but found a {} value.",
            expected,
            self.kind_name()
        ))
    }

    pub fn into_string(self) -> Result<String> {
        match self {
            Value::String(text) | Value::Enum(text) => Ok(text),
            other => Err(other.mismatch("string")),
        }
    }

    pub fn as_bool(&self) -> Result<bool> {
        match self {
            Value::Bool(flag) => Ok(*flag),
            other => Err(other.mismatch("boolean")),
        }
    }

    pub fn as_i64(&self) -> Result<i64> {
        match self {
            Value::Integer(number) => Ok(*number),
            other => Err(other.mismatch("integer")),
        }
    }

    pub fn as_u64(&self) -> Result<u64> {
        match self {
            Value::Unsigned(number) => Ok(*number),
            other => Err(other.mismatch("unsigned integer")),
        }
    }

    pub fn as_f64(&self) -> Result<f64> {
        match self {
            Value::Float(number) => Ok(*number),
            other => Err(other.mismatch("float")),
        }
    }

    pub fn into_version(self) -> Result<Version> {
        match self {
            Value::Version(version) => Ok(version),
            other => Err(other.mismatch("version")),
        }
    }

    pub fn into_path(self) -> Result<PathBuf> {
        match self {
            Value::Path(path) => Ok(path),
            other => Err(other.mismatch("path")),
        }
    }

    pub fn into_object(self) -> Result<Object> {
        match self {
            Value::Object(object) => Ok(object),
            other => Err(other.mismatch("object")),
        }
    }

    /// Downcasts an object value to the contract `C`.
    pub fn into_service<C: ?Sized + 'static>(self) -> Result<Arc<C>> {
        let object = self.into_object()?;
        object.downcast::<C>().ok_or_else(|| {
            ExtensibilityError::construction(format!(
                "Object of type '{}' does not have the requested shape.",
                object.type_name()
            ))
        })
    }

    pub fn into_services<C: ?Sized + 'static>(self) -> Result<Vec<Arc<C>>> {
        match self {
            Value::List(items) => items.into_iter().map(Value::into_service::<C>).collect(),
            other => Err(other.mismatch("list")),
        }
    }

    pub fn into_handle(self) -> Result<ComponentHandle> {
        match self {
            Value::Handle(handle) => Ok(handle),
            other => Err(other.mismatch("component handle")),
        }
    }

    pub fn into_handles(self) -> Result<Vec<ComponentHandle>> {
        match self {
            Value::List(items) => items.into_iter().map(Value::into_handle).collect(),
            other => Err(other.mismatch("list")),
        }
    }

    pub fn into_list(self) -> Result<Vec<Value>> {
        match self {
            Value::List(items) => Ok(items),
            other => Err(other.mismatch("list")),
        }
    }

    pub fn into_plugin_descriptor(self) -> Result<Arc<PluginDescriptor>> {
        match self {
            Value::Plugin(plugin) => Ok(plugin),
            other => Err(other.mismatch("plugin descriptor")),
        }
    }

    pub fn into_component_descriptor(self) -> Result<Arc<ComponentDescriptor>> {
        match self {
            Value::Component(component) => Ok(component),
            other => Err(other.mismatch("component descriptor")),
        }
    }
}

/// Resolved constructor arguments keyed by case-folded parameter name.
#[derive(Debug, Default)]
pub struct Arguments {
    values: HashMap<String, Value>,
}

impl Arguments {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, name: &str, value: Value) {
        self.values.insert(name.to_lowercase(), value);
    }

    pub fn contains(&self, name: &str) -> bool {
        self.values.contains_key(&name.to_lowercase())
    }

    pub fn take(&mut self, name: &str) -> Option<Value> {
        self.values.remove(&name.to_lowercase())
    }

    pub fn required(&mut self, name: &str) -> Result<Value> {
        self.take(name).ok_or_else(|| {
            ExtensibilityError::construction(format!("Missing required argument '{}'.", name))
        })
    }

    pub fn string(&mut self, name: &str) -> Result<String> {
        self.required(name)?.into_string()
    }

    pub fn opt_string(&mut self, name: &str) -> Result<Option<String>> {
        self.take(name).map(Value::into_string).transpose()
    }

    pub fn service<C: ?Sized + 'static>(&mut self, name: &str) -> Result<Arc<C>> {
        self.required(name)?.into_service::<C>()
    }

    pub fn opt_service<C: ?Sized + 'static>(&mut self, name: &str) -> Result<Option<Arc<C>>> {
        self.take(name).map(Value::into_service::<C>).transpose()
    }

    /// All resolved instances for a list parameter, empty when absent.
    pub fn services<C: ?Sized + 'static>(&mut self, name: &str) -> Result<Vec<Arc<C>>> {
        match self.take(name) {
            Some(value) => value.into_services::<C>(),
            None => Ok(Vec::new()),
        }
    }

    pub fn handle(&mut self, name: &str) -> Result<ComponentHandle> {
        self.required(name)?.into_handle()
    }

    pub fn opt_handle(&mut self, name: &str) -> Result<Option<ComponentHandle>> {
        self.take(name).map(Value::into_handle).transpose()
    }

    /// All resolved handles for a list parameter, empty when absent.
    pub fn handles(&mut self, name: &str) -> Result<Vec<ComponentHandle>> {
        match self.take(name) {
            Some(value) => value.into_handles(),
            None => Ok(Vec::new()),
        }
    }

    pub fn object(&mut self, name: &str) -> Result<Object> {
        self.required(name)?.into_object()
    }

    pub fn plugin_descriptor(&mut self, name: &str) -> Result<Arc<PluginDescriptor>> {
        self.required(name)?.into_plugin_descriptor()
    }

    pub fn component_descriptor(&mut self, name: &str) -> Result<Arc<ComponentDescriptor>> {
        self.required(name)?.into_component_descriptor()
    }
}
