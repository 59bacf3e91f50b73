#![cfg(test)]

use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use crate::extensibility::types::{TypeDefinition, TypeRegistry};

pub const IFOO: &str = "Scenario.IFoo, scenario";
pub const FOO_IMPL: &str = "Scenario.FooImpl, scenario";
pub const BAR_IMPL: &str = "Scenario.BarImpl, scenario";

pub trait Foo: Send + Sync {
    fn label(&self) -> &'static str;
}

pub struct FooImpl;

impl Foo for FooImpl {
    fn label(&self) -> &'static str {
        "foo"
    }
}

pub struct BarImpl;

impl Foo for BarImpl {
    fn label(&self) -> &'static str {
        "bar"
    }
}

/// Types for the `IFoo` scenarios; `constructed` counts every instance built.
pub fn foo_types(constructed: Arc<AtomicUsize>) -> Arc<TypeRegistry> {
    let types = TypeRegistry::new();
    types.register_contract::<dyn Foo>(IFOO).unwrap();
    let counter = constructed.clone();
    types
        .register(
            TypeDefinition::<FooImpl>::new(FOO_IMPL)
                .constructor(vec![], move |_| {
                    counter.fetch_add(1, Ordering::SeqCst);
                    Ok(FooImpl)
                })
                .implements::<dyn Foo, _>(IFOO, |foo| foo as Arc<dyn Foo>),
        )
        .unwrap();
    types
        .register(
            TypeDefinition::<BarImpl>::new(BAR_IMPL)
                .constructor(vec![], move |_| {
                    constructed.fetch_add(1, Ordering::SeqCst);
                    Ok(BarImpl)
                })
                .implements::<dyn Foo, _>(IFOO, |bar| bar as Arc<dyn Foo>),
        )
        .unwrap();
    Arc::new(types)
}

pub fn write_file(path: &Path, contents: &str) {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).unwrap();
    }
    std::fs::write(path, contents).unwrap();
}
