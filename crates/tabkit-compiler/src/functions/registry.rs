use hashbrown::hash_map::Entry;
use hashbrown::HashMap;
use static_init::dynamic;

use super::function::{Expander, Function};

pub(super) struct Registry {
    functions: HashMap<&'static str, Function>,
}

impl Registry {
    fn new() -> Self {
        Self {
            functions: HashMap::new(),
        }
    }

    pub(super) fn register(&mut self, signature: &'static str, expander: Expander) {
        let function = Function::try_new(signature, expander)
            .unwrap_or_else(|e| panic!("Failed to parse signature '{signature}': {e:?}"));

        match self.functions.entry(function.name()) {
            Entry::Occupied(_) => {
                // Using panic here is OK because the function registry is initialized
                // statically on first use.
                panic!("Function with name '{}' already registered", function.name())
            }
            Entry::Vacant(vacant) => {
                vacant.insert(function);
            }
        }
    }

    fn get_by_name(&self, name: &str) -> Option<&Function> {
        self.functions.get(name)
    }

    fn iter(&self) -> impl Iterator<Item = &Function> {
        self.functions.values()
    }
}

/// Get the registered function with the given name.
///
/// Returns `None` for names compiled as calls to awk builtins.
pub fn get_function(name: &str) -> Option<&'static Function> {
    REGISTRY.get_by_name(name)
}

/// Return an iterator over all registered functions, sorted by name.
pub fn registered_functions() -> impl Iterator<Item = &'static Function> {
    let mut functions: Vec<_> = REGISTRY.iter().collect();
    functions.sort_by_key(|function| function.name());
    functions.into_iter()
}

#[dynamic]
static REGISTRY: Registry = {
    let mut registry = Registry::new();
    super::register_functions(&mut registry);
    registry
};
