//! Helper function table shared with every rule
//!
//! The engine registers one [`FunctionTable`] into the working memory before
//! rules are initialized, and hands the same table to each rule through
//! [`InitContext`](crate::InitContext). Guards and actions reach helpers by
//! name through `Expr::Call` and `Effect::Call`.

use crate::{Error, Result, Value};
use indexmap::IndexMap;
use std::fmt;
use std::sync::Arc;

/// A callable helper
pub type Function = Arc<dyn Fn(&[Value]) -> Result<Value> + Send + Sync>;

/// Named helper functions available to guards and actions
#[derive(Clone, Default)]
pub struct FunctionTable {
    functions: IndexMap<String, Function>,
}

impl FunctionTable {
    /// Create an empty table
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a table preloaded with the built-in helpers
    ///
    /// | name       | args            | result                         |
    /// |------------|-----------------|--------------------------------|
    /// | `len`      | string/list/map | int                            |
    /// | `abs`      | number          | float                          |
    /// | `min`      | number...       | float                          |
    /// | `max`      | number...       | float                          |
    /// | `is_null`  | any             | bool                           |
    /// | `str`      | any             | string (strings are unquoted)  |
    /// | `upper`    | string          | string                         |
    /// | `lower`    | string          | string                         |
    /// | `contains` | list/string, x  | bool                           |
    /// | `log`      | any...          | null, emits an info event      |
    pub fn with_builtins() -> Self {
        let mut table = Self::new();

        table.register("len", |args| {
            let [v] = expect_args::<1>("len", args)?;
            let len = match v {
                Value::String(s) => s.chars().count(),
                Value::List(list) => list.len(),
                Value::Map(map) => map.len(),
                other => return Err(Error::type_error("string, list or map", other.type_name())),
            };
            Ok(Value::Int(len as i64))
        });
        table.register("abs", |args| {
            let [v] = expect_args::<1>("abs", args)?;
            Ok(Value::Float(v.expect_number()?.abs()))
        });
        table.register("min", |args| fold_numbers("min", args, f64::min));
        table.register("max", |args| fold_numbers("max", args, f64::max));
        table.register("is_null", |args| {
            let [v] = expect_args::<1>("is_null", args)?;
            Ok(Value::Bool(v.is_null()))
        });
        table.register("str", |args| {
            let [v] = expect_args::<1>("str", args)?;
            Ok(Value::String(plain_string(v)))
        });
        table.register("upper", |args| {
            let [v] = expect_args::<1>("upper", args)?;
            let s = v.as_str().ok_or_else(|| Error::type_error("string", v.type_name()))?;
            Ok(Value::String(s.to_uppercase()))
        });
        table.register("lower", |args| {
            let [v] = expect_args::<1>("lower", args)?;
            let s = v.as_str().ok_or_else(|| Error::type_error("string", v.type_name()))?;
            Ok(Value::String(s.to_lowercase()))
        });
        table.register("contains", |args| {
            let [haystack, needle] = expect_args::<2>("contains", args)?;
            match haystack {
                Value::List(list) => Ok(Value::Bool(list.contains(needle))),
                Value::String(s) => {
                    let n = needle
                        .as_str()
                        .ok_or_else(|| Error::type_error("string", needle.type_name()))?;
                    Ok(Value::Bool(s.contains(n)))
                }
                other => Err(Error::type_error("list or string", other.type_name())),
            }
        });
        table.register("log", |args| {
            let message = args.iter().map(plain_string).collect::<Vec<_>>().join(" ");
            tracing::info!(target: "salience::rules", "{}", message);
            Ok(Value::Null)
        });

        table
    }

    /// Register (or replace) a helper under the given name
    pub fn register<F>(&mut self, name: impl Into<String>, f: F)
    where
        F: Fn(&[Value]) -> Result<Value> + Send + Sync + 'static,
    {
        self.functions.insert(name.into(), Arc::new(f));
    }

    /// Call a helper by name
    pub fn call(&self, name: &str, args: &[Value]) -> Result<Value> {
        let f = self
            .functions
            .get(name)
            .ok_or_else(|| Error::FunctionNotFound(name.to_string()))?;
        f(args)
    }

    /// Check whether a helper is registered
    pub fn contains(&self, name: &str) -> bool {
        self.functions.contains_key(name)
    }

    /// Names of all registered helpers, in registration order
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.functions.keys().map(String::as_str)
    }

    /// Number of registered helpers
    pub fn len(&self) -> usize {
        self.functions.len()
    }

    /// Check if the table is empty
    pub fn is_empty(&self) -> bool {
        self.functions.is_empty()
    }
}

impl fmt::Debug for FunctionTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FunctionTable")
            .field("functions", &self.functions.keys().collect::<Vec<_>>())
            .finish()
    }
}

/// Destructure an argument slice of exactly `N` values
fn expect_args<'a, const N: usize>(name: &str, args: &'a [Value]) -> Result<&'a [Value; N]> {
    args.try_into().map_err(|_| {
        Error::InvalidOperation(format!(
            "{} expects {} argument(s), got {}",
            name,
            N,
            args.len()
        ))
    })
}

fn fold_numbers(name: &str, args: &[Value], f: fn(f64, f64) -> f64) -> Result<Value> {
    let (first, rest) = args
        .split_first()
        .ok_or_else(|| Error::InvalidOperation(format!("{} expects at least 1 argument", name)))?;
    let mut acc = first.expect_number()?;
    for v in rest {
        acc = f(acc, v.expect_number()?);
    }
    Ok(Value::Float(acc))
}

fn plain_string(v: &Value) -> String {
    match v {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
