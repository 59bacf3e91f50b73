use std::sync::Arc;

use log::warn;

use crate::extensibility::error::{ExtensibilityError, Result};
use crate::extensibility::object::{Arguments, Object, Value};
use crate::extensibility::property_set::PropertySet;
use crate::extensibility::resolver::ObjectDependencyResolver;
use crate::extensibility::types::{Constructor, ParamSpec, TypeInfo};

/// Builds instances of a concrete type, injecting constructor arguments
/// and settable properties through an [`ObjectDependencyResolver`].
pub struct ObjectFactory {
    resolver: Arc<dyn ObjectDependencyResolver>,
    object_type: Arc<TypeInfo>,
    properties: PropertySet,
}

impl ObjectFactory {
    pub fn new(
        resolver: Arc<dyn ObjectDependencyResolver>,
        object_type: Arc<TypeInfo>,
        properties: PropertySet,
    ) -> Self {
        ObjectFactory {
            resolver,
            object_type,
            properties,
        }
    }

    pub fn object_type(&self) -> &Arc<TypeInfo> {
        &self.object_type
    }

    pub fn create_instance(&self) -> Result<Object> {
        let type_name = self.object_type.name();
        let concrete = self.object_type.as_concrete().ok_or_else(|| {
            ExtensibilityError::construction(format!(
                "Type '{}' is abstract and cannot be instantiated.",
                type_name
            ))
        })?;
        let constructor = select_constructor(concrete.constructors()).ok_or_else(|| {
            ExtensibilityError::construction(format!(
                "Type '{}' does not have any constructors.",
                type_name
            ))
        })?;

        let mut arguments = Arguments::new();
        for param in constructor.params() {
            let value = self.resolve(param).map_err(|e| {
                e.into_construction(format!(
                    "Could not resolve dependency '{}' of type '{}'.",
                    param.name, type_name
                ))
            })?;
            match value {
                Some(value) => arguments.insert(&param.name, value),
                None if param.required => {
                    return Err(ExtensibilityError::construction(format!(
                        "Could not resolve required dependency '{}' of type '{}'.",
                        param.name, type_name
                    )));
                }
                None => {}
            }
        }

        let mut instance = constructor.invoke(&mut arguments).map_err(|e| {
            e.into_construction(format!(
                "Could not construct an instance of type '{}'.",
                type_name
            ))
        })?;

        for property in concrete.properties() {
            let spec = property.spec();
            if constructor
                .params()
                .iter()
                .any(|param| param.name.eq_ignore_ascii_case(&spec.name))
            {
                continue;
            }
            match self.resolve(spec) {
                Ok(Some(value)) => {
                    if let Err(e) = property.apply(&mut *instance, value) {
                        warn!(
                            "Skipping property '{}' of type '{}': {}",
                            spec.name, type_name, e
                        );
                    }
                }
                Ok(None) => {}
                Err(e) => warn!(
                    "Skipping optional dependency '{}' of type '{}': {}",
                    spec.name, type_name, e
                ),
            }
        }

        let view = concrete.seal(instance).ok_or_else(|| {
            ExtensibilityError::construction(format!(
                "Constructor of type '{}' produced an instance of another type.",
                type_name
            ))
        })?;
        Ok(Object::from_concrete(self.object_type.clone(), view))
    }

    fn resolve(&self, spec: &ParamSpec) -> Result<Option<Value>> {
        let configuration = self.properties.get(&spec.name);
        self.resolver
            .resolve_dependency(&spec.name, &spec.kind, configuration)
            .map(|resolution| resolution.into_value())
    }
}

/// The constructor with the most parameters; the first declared wins ties.
fn select_constructor(constructors: &[Constructor]) -> Option<&Constructor> {
    let mut best: Option<&Constructor> = None;
    for candidate in constructors {
        if best.is_none_or(|current| candidate.params().len() > current.params().len()) {
            best = Some(candidate);
        }
    }
    best
}
