//! Statistic values and user statistic functions

use std::any::Any;
use std::fmt;
use std::sync::Arc;

use serde_json::{json, Value};

use crate::errors::BoxedError;
use crate::extractor::ArrayInfo;
use crate::item::Item;
use crate::point::SurveyPoint;

/// Result of a statistic function
#[derive(Clone)]
pub enum StatValue {
    /// One float per asset
    Floats(Vec<f64>),
    /// One count per asset
    Counts(Vec<usize>),
    Number(f64),
    Text(String),
    Json(Value),
    /// Any other caller-defined value
    Any(Arc<dyn Any + Send + Sync>),
}

impl StatValue {
    /// Wraps an arbitrary value
    pub fn any<T: Any + Send + Sync>(value: T) -> Self {
        StatValue::Any(Arc::new(value))
    }

    /// Borrows the value held by `StatValue::Any`
    pub fn downcast_ref<T: Any>(&self) -> Option<&T> {
        match self {
            StatValue::Any(v) => v.downcast_ref::<T>(),
            _ => None,
        }
    }

    /// Floats, widening counts
    pub fn as_floats(&self) -> Option<Vec<f64>> {
        match self {
            StatValue::Floats(v) => Some(v.clone()),
            StatValue::Counts(v) => Some(v.iter().map(|c| *c as f64).collect()),
            StatValue::Number(n) => Some(vec![*n]),
            _ => None,
        }
    }

    /// JSON rendering; NaN becomes null and opaque values a placeholder
    pub fn to_json(&self) -> Value {
        let number = |f: f64| if f.is_finite() { json!(f) } else { Value::Null };
        match self {
            StatValue::Floats(v) => Value::Array(v.iter().map(|f| number(*f)).collect()),
            StatValue::Counts(v) => json!(v),
            StatValue::Number(n) => number(*n),
            StatValue::Text(s) => json!(s),
            StatValue::Json(v) => v.clone(),
            StatValue::Any(_) => json!("<opaque>"),
        }
    }
}

impl fmt::Debug for StatValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StatValue::Floats(v) => f.debug_tuple("Floats").field(v).finish(),
            StatValue::Counts(v) => f.debug_tuple("Counts").field(v).finish(),
            StatValue::Number(n) => f.debug_tuple("Number").field(n).finish(),
            StatValue::Text(s) => f.debug_tuple("Text").field(s).finish(),
            StatValue::Json(v) => f.debug_tuple("Json").field(v).finish(),
            StatValue::Any(_) => f.write_str("Any(..)"),
        }
    }
}

impl PartialEq for StatValue {
    fn eq(&self, other: &Self) -> bool {
        let same_floats = |a: &[f64], b: &[f64]| {
            a.len() == b.len() && a.iter().zip(b).all(|(x, y)| x == y || (x.is_nan() && y.is_nan()))
        };
        match (self, other) {
            (StatValue::Floats(a), StatValue::Floats(b)) => same_floats(a, b),
            (StatValue::Counts(a), StatValue::Counts(b)) => a == b,
            (StatValue::Number(a), StatValue::Number(b)) => same_floats(&[*a], &[*b]),
            (StatValue::Text(a), StatValue::Text(b)) => a == b,
            (StatValue::Json(a), StatValue::Json(b)) => a == b,
            (StatValue::Any(a), StatValue::Any(b)) => Arc::ptr_eq(a, b),
            _ => false,
        }
    }
}

impl From<f64> for StatValue {
    fn from(value: f64) -> Self {
        StatValue::Number(value)
    }
}

impl From<Vec<f64>> for StatValue {
    fn from(value: Vec<f64>) -> Self {
        StatValue::Floats(value)
    }
}

impl From<String> for StatValue {
    fn from(value: String) -> Self {
        StatValue::Text(value)
    }
}

impl From<Value> for StatValue {
    fn from(value: Value) -> Self {
        StatValue::Json(value)
    }
}

/// Signature of a user statistic: the arrays read for one item at one
/// point, in asset order, plus the item and the point
pub type StatFn =
    dyn Fn(&[ArrayInfo], &Item, &SurveyPoint) -> Result<StatValue, BoxedError> + Send + Sync;

/// A named user statistic
#[derive(Clone)]
pub struct UserStat {
    name: String,
    func: Arc<StatFn>,
}

impl UserStat {
    pub fn new<F>(name: &str, func: F) -> Self
    where
        F: Fn(&[ArrayInfo], &Item, &SurveyPoint) -> Result<StatValue, BoxedError> + Send + Sync + 'static,
    {
        UserStat {
            name: name.to_string(),
            func: Arc::new(func),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Invokes the function
    pub fn call(&self, arrays: &[ArrayInfo], item: &Item, point: &SurveyPoint) -> Result<StatValue, BoxedError> {
        (self.func)(arrays, item, point)
    }
}

impl fmt::Debug for UserStat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UserStat").field("name", &self.name).finish()
    }
}
