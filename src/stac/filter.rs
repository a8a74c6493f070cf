//! Item property filters for the STAC query extension
//!
//! Filters are written as `name<op>value`, for example
//! `eo:cloud_cover<=20` or `sentinel:utm_zone=55`.

use std::str::FromStr;

use lazy_static::lazy_static;
use regex::Regex;
use serde_json::{Map, Value};

use crate::errors::DrillError;

lazy_static! {
    static ref FILTER_RE: Regex = Regex::new(r"^\s*([^<>=!\s]+)\s*(<=|>=|!=|=|<|>)\s*(.+?)\s*$")
        .unwrap_or_else(|e| panic!("invalid filter pattern: {}", e));
}

/// One comparison on an item property
#[derive(Debug, Clone, PartialEq)]
pub struct PropertyFilter {
    pub property: String,
    /// Query extension operator: `eq`, `neq`, `lt`, `lte`, `gt` or `gte`
    pub op: &'static str,
    pub value: Value,
}

impl FromStr for PropertyFilter {
    type Err = DrillError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let caps = FILTER_RE
            .captures(s)
            .ok_or_else(|| DrillError::Configuration(format!("Invalid property filter: {}", s)))?;
        let op = match &caps[2] {
            "=" => "eq",
            "!=" => "neq",
            "<" => "lt",
            "<=" => "lte",
            ">" => "gt",
            _ => "gte",
        };
        Ok(PropertyFilter {
            property: caps[1].to_string(),
            op,
            value: parse_value(&caps[3]),
        })
    }
}

fn parse_value(raw: &str) -> Value {
    let unquoted = raw.trim_matches(|c| c == '"' || c == '\'');
    if unquoted.len() != raw.len() {
        return Value::String(unquoted.to_string());
    }
    if let Ok(i) = raw.parse::<i64>() {
        return Value::from(i);
    }
    if let Ok(f) = raw.parse::<f64>() {
        if f.is_finite() {
            return Value::from(f);
        }
    }
    match raw {
        "true" => Value::Bool(true),
        "false" => Value::Bool(false),
        _ => Value::String(raw.to_string()),
    }
}

/// Builds the `query` object, merging filters on the same property
pub fn build_query(filters: &[PropertyFilter]) -> Option<Value> {
    if filters.is_empty() {
        return None;
    }
    let mut query = Map::new();
    for filter in filters {
        let entry = query
            .entry(filter.property.clone())
            .or_insert_with(|| Value::Object(Map::new()));
        if let Value::Object(ops) = entry {
            ops.insert(filter.op.to_string(), filter.value.clone());
        }
    }
    Some(Value::Object(query))
}

/// Parses a list of filter strings
pub fn parse_filters<S: AsRef<str>>(filters: &[S]) -> Result<Vec<PropertyFilter>, DrillError> {
    filters.iter().map(|f| f.as_ref().parse()).collect()
}
