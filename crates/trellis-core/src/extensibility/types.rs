//! Explicit type registry.
//!
//! Plugins, services and components name their implementation types with
//! string identifiers such as `"Acme.Greeter, Acme"`. The [`TypeRegistry`]
//! maps those identifiers to registered [`TypeInfo`] records: contracts
//! (abstract service types) and concrete types described by a
//! [`TypeDefinition`] with constructors, settable properties and the
//! contracts they can be cast to.
use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;

use parking_lot::RwLock;

use crate::extensibility::error::{ExtensibilityError, Result};
use crate::extensibility::object::{Arguments, Value};
use crate::extensibility::traits;

/// A type identifier, optionally qualified by the module that defines it.
///
/// The short form is the text before the first `,`, so
/// `"Acme.Greeter, Acme"` and `"Acme.Greeter"` share the short form
/// `"Acme.Greeter"`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TypeName(String);

impl TypeName {
    pub fn new(name: impl Into<String>) -> Self {
        TypeName(name.into().trim().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn short_name(&self) -> &str {
        self.0.split(',').next().unwrap_or_default().trim()
    }

    pub fn is_qualified(&self) -> bool {
        self.0.contains(',')
    }

    /// True when both names are equal, or when one of them is unqualified
    /// and the short forms agree.
    pub fn matches(&self, other: &TypeName) -> bool {
        if self == other {
            return true;
        }
        (!self.is_qualified() || !other.is_qualified()) && self.short_name() == other.short_name()
    }
}

impl fmt::Display for TypeName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for TypeName {
    fn from(name: &str) -> Self {
        TypeName::new(name)
    }
}

impl From<String> for TypeName {
    fn from(name: String) -> Self {
        TypeName::new(name)
    }
}

impl From<&TypeName> for TypeName {
    fn from(name: &TypeName) -> Self {
        name.clone()
    }
}

/// An enumerated type whose variants are matched case-insensitively.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnumSpec {
    pub name: String,
    pub variants: Vec<String>,
}

impl EnumSpec {
    /// Returns the canonical spelling of the matching variant.
    pub fn parse(&self, text: &str) -> Option<&str> {
        let text = text.trim();
        self.variants
            .iter()
            .find(|variant| variant.eq_ignore_ascii_case(text))
            .map(String::as_str)
    }
}

/// Resource kinds resolved through a resource locator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResourceKind {
    Image,
    Icon,
    File,
    Directory,
}

/// The semantic type of a constructor parameter or property.
#[derive(Debug, Clone, PartialEq)]
pub enum ValueKind {
    String,
    Bool,
    Integer,
    Unsigned,
    Float,
    Version,
    Enum(EnumSpec),
    Resource(ResourceKind),
    /// An instance of the named contract.
    Service(TypeName),
    /// A handle to a component of the named contract, activated on demand.
    Handle(TypeName),
    List(Box<ValueKind>),
    /// The traits object of the descriptor being activated.
    Traits,
    PluginDescriptor,
    ComponentDescriptor,
}

impl ValueKind {
    pub fn service(contract: impl Into<TypeName>) -> Self {
        ValueKind::Service(contract.into())
    }

    pub fn handle(contract: impl Into<TypeName>) -> Self {
        ValueKind::Handle(contract.into())
    }

    pub fn list_of(element: ValueKind) -> Self {
        ValueKind::List(Box::new(element))
    }

    pub fn enumeration(name: impl Into<String>, variants: &[&str]) -> Self {
        ValueKind::Enum(EnumSpec {
            name: name.into(),
            variants: variants.iter().map(|v| v.to_string()).collect(),
        })
    }
}

/// A named, typed slot filled by the dependency resolver.
#[derive(Debug, Clone, PartialEq)]
pub struct ParamSpec {
    pub name: String,
    pub kind: ValueKind,
    pub required: bool,
}

impl ParamSpec {
    pub fn required(name: impl Into<String>, kind: ValueKind) -> Self {
        ParamSpec {
            name: name.into(),
            kind,
            required: true,
        }
    }

    pub fn optional(name: impl Into<String>, kind: ValueKind) -> Self {
        ParamSpec {
            name: name.into(),
            kind,
            required: false,
        }
    }
}

type ErasedInstance = Box<dyn Any + Send + Sync>;
type BuildFn = dyn Fn(&mut Arguments) -> Result<ErasedInstance> + Send + Sync;
type SetFn = dyn Fn(&mut (dyn Any + Send + Sync), Value) -> Result<()> + Send + Sync;
type SealFn = dyn Fn(ErasedInstance) -> Option<Arc<dyn Any + Send + Sync>> + Send + Sync;
type CastFn = dyn Fn(&(dyn Any + Send + Sync)) -> Option<Arc<dyn Any + Send + Sync>> + Send + Sync;

pub struct Constructor {
    params: Vec<ParamSpec>,
    build: Box<BuildFn>,
}

impl Constructor {
    pub fn params(&self) -> &[ParamSpec] {
        &self.params
    }

    pub(crate) fn invoke(&self, arguments: &mut Arguments) -> Result<ErasedInstance> {
        (self.build)(arguments)
    }
}

pub struct Property {
    spec: ParamSpec,
    set: Box<SetFn>,
}

impl Property {
    pub fn spec(&self) -> &ParamSpec {
        &self.spec
    }

    pub(crate) fn apply(&self, target: &mut (dyn Any + Send + Sync), value: Value) -> Result<()> {
        (self.set)(target, value)
    }
}

struct Cast {
    contract: TypeName,
    apply: Box<CastFn>,
}

/// An abstract service type.
pub struct ContractType {
    name: TypeName,
    traits_type: Option<TypeName>,
}

/// A type that can be instantiated by the object factory.
pub struct ConcreteType {
    name: TypeName,
    constructors: Vec<Constructor>,
    properties: Vec<Property>,
    casts: Vec<Cast>,
    seal: Box<SealFn>,
}

impl ConcreteType {
    pub fn name(&self) -> &TypeName {
        &self.name
    }

    pub fn constructors(&self) -> &[Constructor] {
        &self.constructors
    }

    pub fn properties(&self) -> &[Property] {
        &self.properties
    }

    pub fn implements(&self, contract: &TypeName) -> bool {
        self.casts.iter().any(|cast| cast.contract.matches(contract))
    }

    /// Moves a freshly built instance into shared storage.
    pub(crate) fn seal(&self, instance: ErasedInstance) -> Option<Arc<dyn Any + Send + Sync>> {
        (self.seal)(instance)
    }

    pub(crate) fn cast(
        &self,
        instance: &(dyn Any + Send + Sync),
        contract: &TypeName,
    ) -> Option<Arc<dyn Any + Send + Sync>> {
        self.casts
            .iter()
            .find(|cast| cast.contract.matches(contract))
            .and_then(|cast| (cast.apply)(instance))
    }
}

pub enum TypeInfo {
    Contract(ContractType),
    Concrete(ConcreteType),
}

impl TypeInfo {
    pub fn name(&self) -> &TypeName {
        match self {
            TypeInfo::Contract(contract) => &contract.name,
            TypeInfo::Concrete(concrete) => &concrete.name,
        }
    }

    pub fn is_abstract(&self) -> bool {
        matches!(self, TypeInfo::Contract(_))
    }

    /// The traits type declared for a contract.
    pub fn traits_type(&self) -> Option<&TypeName> {
        match self {
            TypeInfo::Contract(contract) => contract.traits_type.as_ref(),
            TypeInfo::Concrete(_) => None,
        }
    }

    pub fn as_concrete(&self) -> Option<&ConcreteType> {
        match self {
            TypeInfo::Concrete(concrete) => Some(concrete),
            TypeInfo::Contract(_) => None,
        }
    }

    pub fn is_assignable_to(&self, contract: &TypeName) -> bool {
        match self {
            TypeInfo::Contract(this) => this.name.matches(contract),
            TypeInfo::Concrete(this) => this.implements(contract),
        }
    }
}

impl fmt::Debug for TypeInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TypeInfo::Contract(contract) => f
                .debug_struct("Contract")
                .field("name", &contract.name)
                .field("traits_type", &contract.traits_type)
                .finish(),
            TypeInfo::Concrete(concrete) => f
                .debug_struct("Concrete")
                .field("name", &concrete.name)
                .field("constructors", &concrete.constructors.len())
                .field("properties", &concrete.properties.len())
                .finish(),
        }
    }
}

/// Builder describing how to construct and inject a concrete type `T`.
///
/// ```
/// use std::sync::Arc;
/// use trellis_core::extensibility::{ParamSpec, TypeDefinition, TypeRegistry, ValueKind};
///
/// trait Greeter: Send + Sync {
///     fn greet(&self) -> String;
/// }
///
/// struct Hello {
///     name: String,
/// }
///
/// impl Greeter for Hello {
///     fn greet(&self) -> String {
///         format!("hello {}", self.name)
///     }
/// }
///
/// let types = TypeRegistry::new();
/// types.register_contract::<dyn Greeter>("Acme.Greeter, Acme").unwrap();
/// types
///     .register(
///         TypeDefinition::<Hello>::new("Acme.Hello, Acme")
///             .constructor(vec![ParamSpec::required("name", ValueKind::String)], |args| {
///                 Ok(Hello { name: args.string("name")? })
///             })
///             .implements::<dyn Greeter, _>("Acme.Greeter, Acme", |hello| hello as Arc<dyn Greeter>),
///     )
///     .unwrap();
/// ```
pub struct TypeDefinition<T> {
    name: TypeName,
    constructors: Vec<Constructor>,
    properties: Vec<Property>,
    casts: Vec<Cast>,
    _marker: PhantomData<fn() -> T>,
}

impl<T: Send + Sync + 'static> TypeDefinition<T> {
    pub fn new(name: &str) -> Self {
        let name = TypeName::new(name);
        let identity = Cast {
            contract: name.clone(),
            apply: Box::new(|instance: &(dyn Any + Send + Sync)| {
                instance
                    .downcast_ref::<Arc<T>>()
                    .map(|value| Arc::new(value.clone()) as Arc<dyn Any + Send + Sync>)
            }),
        };
        TypeDefinition {
            name,
            constructors: Vec::new(),
            properties: Vec::new(),
            casts: vec![identity],
            _marker: PhantomData,
        }
    }

    pub fn constructor<F>(mut self, params: Vec<ParamSpec>, build: F) -> Self
    where
        F: Fn(&mut Arguments) -> Result<T> + Send + Sync + 'static,
    {
        self.constructors.push(Constructor {
            params,
            build: Box::new(move |arguments: &mut Arguments| {
                build(arguments).map(|value| Box::new(value) as ErasedInstance)
            }),
        });
        self
    }

    pub fn property<F>(mut self, spec: ParamSpec, set: F) -> Self
    where
        F: Fn(&mut T, Value) -> Result<()> + Send + Sync + 'static,
    {
        let name = spec.name.clone();
        self.properties.push(Property {
            spec,
            set: Box::new(move |target: &mut (dyn Any + Send + Sync), value: Value| {
                match target.downcast_mut::<T>() {
                    Some(target) => set(target, value),
                    None => Err(ExtensibilityError::construction(format!(
                        "Property '{}' was applied to an instance of the wrong type.",
                        name
                    ))),
                }
            }),
        });
        self
    }

    /// Declares that `T` can be viewed as the contract `C`.
    pub fn implements<C, F>(mut self, contract: &str, cast: F) -> Self
    where
        C: ?Sized + Send + Sync + 'static,
        F: Fn(Arc<T>) -> Arc<C> + Send + Sync + 'static,
    {
        self.casts.push(Cast {
            contract: TypeName::new(contract),
            apply: Box::new(move |instance: &(dyn Any + Send + Sync)| {
                instance
                    .downcast_ref::<Arc<T>>()
                    .map(|value| Arc::new(cast(value.clone())) as Arc<dyn Any + Send + Sync>)
            }),
        });
        self
    }

    fn into_type_info(self) -> TypeInfo {
        TypeInfo::Concrete(ConcreteType {
            name: self.name,
            constructors: self.constructors,
            properties: self.properties,
            casts: self.casts,
            seal: Box::new(|instance: ErasedInstance| {
                instance
                    .downcast::<T>()
                    .ok()
                    .map(|value| Arc::new(Arc::<T>::from(value)) as Arc<dyn Any + Send + Sync>)
            }),
        })
    }
}

#[derive(Default)]
struct TypeTable {
    types: HashMap<TypeName, Arc<TypeInfo>>,
    short_names: HashMap<String, TypeName>,
    contracts: HashMap<TypeId, TypeName>,
}

impl TypeTable {
    fn add(&mut self, info: TypeInfo, contract: Option<TypeId>) {
        let name = info.name().clone();
        self.short_names
            .entry(name.short_name().to_string())
            .or_insert_with(|| name.clone());
        if let Some(type_id) = contract {
            self.contracts.entry(type_id).or_insert_with(|| name.clone());
        }
        self.types.insert(name, Arc::new(info));
    }
}

/// Maps type identifiers to their registered definitions.
///
/// A new registry always contains the built-in plugin, traits and locator
/// types.
pub struct TypeRegistry {
    table: RwLock<TypeTable>,
}

impl TypeRegistry {
    pub fn new() -> Self {
        let mut table = TypeTable::default();
        for (info, contract) in traits::builtin_types() {
            table.add(info, contract);
        }
        TypeRegistry {
            table: RwLock::new(table),
        }
    }

    /// Registers a contract implemented as the trait object type `C`.
    pub fn register_contract<C: ?Sized + 'static>(&self, name: &str) -> Result<()> {
        self.register_contract_with_traits::<C>(name, None)
    }

    /// Registers a contract whose components carry traits of `traits_type`.
    pub fn register_contract_with_traits<C: ?Sized + 'static>(
        &self,
        name: &str,
        traits_type: Option<&str>,
    ) -> Result<()> {
        let info = TypeInfo::Contract(ContractType {
            name: TypeName::new(name),
            traits_type: traits_type.map(TypeName::new),
        });
        self.insert(info, Some(TypeId::of::<C>()))
    }

    pub fn register<T: Send + Sync + 'static>(&self, definition: TypeDefinition<T>) -> Result<()> {
        self.insert(definition.into_type_info(), None)
    }

    fn insert(&self, info: TypeInfo, contract: Option<TypeId>) -> Result<()> {
        let mut table = self.table.write();
        if table.types.contains_key(info.name()) {
            return Err(ExtensibilityError::Validation(format!(
                "A type named '{}' is already registered.",
                info.name()
            )));
        }
        table.add(info, contract);
        Ok(())
    }

    /// Looks a type up by its exact identifier, falling back to its short form.
    pub fn resolve(&self, name: &TypeName) -> Result<Arc<TypeInfo>> {
        let table = self.table.read();
        if let Some(info) = table.types.get(name) {
            return Ok(info.clone());
        }
        table
            .short_names
            .get(name.short_name())
            .and_then(|full| table.types.get(full))
            .cloned()
            .ok_or_else(|| {
                ExtensibilityError::resolution(
                    name.as_str(),
                    format!("Could not resolve type '{}'.", name),
                )
            })
    }

    pub fn contains(&self, name: &TypeName) -> bool {
        self.resolve(name).is_ok()
    }

    /// The identifier under which the trait object type `C` was registered.
    pub fn contract_name_of<C: ?Sized + 'static>(&self) -> Option<TypeName> {
        self.table.read().contracts.get(&TypeId::of::<C>()).cloned()
    }
}

impl Default for TypeRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for TypeRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TypeRegistry")
            .field("types", &self.table.read().types.len())
            .finish()
    }
}

pub(crate) fn contract_type(name: &str, type_id: TypeId) -> (TypeInfo, Option<TypeId>) {
    (
        TypeInfo::Contract(ContractType {
            name: TypeName::new(name),
            traits_type: None,
        }),
        Some(type_id),
    )
}

pub(crate) fn concrete_type<T: Send + Sync + 'static>(
    definition: TypeDefinition<T>,
) -> (TypeInfo, Option<TypeId>) {
    (definition.into_type_info(), None)
}
