//! Built-in functions

pub mod array;
pub mod logical;
pub mod math;

use crate::error::FormulaResult;
use gridcalc_core::Value;
use std::collections::HashMap;
use std::sync::OnceLock;

/// Function implementation signature; arguments arrive evaluated
pub type FunctionImpl = fn(&[Value]) -> FormulaResult<Value>;

/// Function definition
pub struct FunctionDef {
    /// Function name (uppercase)
    pub name: &'static str,
    pub min_args: usize,
    /// Maximum arguments (None = unlimited)
    pub max_args: Option<usize>,
    pub implementation: FunctionImpl,
}

/// Lookup table of the built-in functions
pub struct FunctionRegistry {
    functions: HashMap<&'static str, FunctionDef>,
}

static REGISTRY: OnceLock<FunctionRegistry> = OnceLock::new();

/// The shared registry, built on first use
pub fn registry() -> &'static FunctionRegistry {
    REGISTRY.get_or_init(FunctionRegistry::new)
}

impl FunctionRegistry {
    /// Registry with every built-in function
    pub fn new() -> Self {
        let mut registry = Self {
            functions: HashMap::new(),
        };

        registry.register("SUM", 1, None, math::fn_sum);
        registry.register("AVERAGE", 1, None, math::fn_average);
        registry.register("MIN", 1, None, math::fn_min);
        registry.register("MAX", 1, None, math::fn_max);
        registry.register("COUNT", 1, None, math::fn_count);
        registry.register("ABS", 1, Some(1), math::fn_abs);
        registry.register("ROUND", 1, Some(2), math::fn_round);

        registry.register("IF", 2, Some(3), logical::fn_if);
        registry.register("AND", 1, None, logical::fn_and);
        registry.register("OR", 1, None, logical::fn_or);
        registry.register("NOT", 1, Some(1), logical::fn_not);
        registry.register("ISERROR", 1, Some(1), logical::fn_iserror);

        registry.register("TRANSPOSE", 1, Some(1), array::fn_transpose);
        registry.register("MMULT", 2, Some(2), array::fn_mmult);
        registry.register("SEQUENCE", 1, Some(4), array::fn_sequence);

        registry
    }

    fn register(
        &mut self,
        name: &'static str,
        min_args: usize,
        max_args: Option<usize>,
        implementation: FunctionImpl,
    ) {
        self.functions.insert(
            name,
            FunctionDef {
                name,
                min_args,
                max_args,
                implementation,
            },
        );
    }

    /// Look up a function by name, ignoring case
    pub fn get(&self, name: &str) -> Option<&FunctionDef> {
        self.functions.get(name.to_ascii_uppercase().as_str())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    /// Names of all registered functions
    pub fn names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.functions.values().map(|def| def.name)
    }
}

impl Default for FunctionRegistry {
    fn default() -> Self {
        Self::new()
    }
}
