//! Parsing of transformation strings.
//!
//! A request carries an ordered list of strings, one per step:
//!
//! ```text
//! border:color=fff,width=2,height=2
//! compress:level=90
//! flipHorizontally
//! ```
//!
//! Grammar: `NAME` or `NAME:KEY=VALUE,KEY=VALUE,...`. Values of keys in the
//! numeric set (by default `width`, `height`, `x`, `y`) become integers;
//! every other value stays the verbatim string. Order is preserved and
//! names may repeat; each element is an independent step.

use crate::error::{Error, Result};
use std::fmt;

/// Keys whose values are parsed as integers unless configured otherwise.
pub const DEFAULT_NUMERIC_KEYS: &[&str] = &["width", "height", "x", "y"];

/// A single parameter value.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ParamValue {
    Int(i64),
    Str(String),
}

impl fmt::Display for ParamValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParamValue::Int(n) => write!(f, "{n}"),
            ParamValue::Str(s) => write!(f, "{s}"),
        }
    }
}

/// Ordered parameter list of one step. Lookups see the last value given for
/// a key.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct Params(Vec<(String, ParamValue)>);

impl Params {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, key: impl Into<String>, value: ParamValue) {
        self.0.push((key.into(), value));
    }

    pub fn get(&self, key: &str) -> Option<&ParamValue> {
        self.0.iter().rev().find(|(k, _)| k == key).map(|(_, v)| v)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &ParamValue)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v))
    }
}

/// One parsed step: a transformation name and its parameters.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TransformationDescriptor {
    pub name: String,
    pub params: Params,
}

impl TransformationDescriptor {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            params: Params::new(),
        }
    }

    pub fn with_param(mut self, key: impl Into<String>, value: ParamValue) -> Self {
        self.params.insert(key, value);
        self
    }
}

/// Canonical form, re-parseable with the same numeric key set.
impl fmt::Display for TransformationDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name)?;
        for (i, (key, value)) in self.params.iter().enumerate() {
            let sep = if i == 0 { ':' } else { ',' };
            write!(f, "{sep}{key}={value}")?;
        }
        Ok(())
    }
}

/// Parser for transformation lists.
#[derive(Debug, Clone)]
pub struct SpecParser {
    numeric_keys: Vec<String>,
}

impl Default for SpecParser {
    fn default() -> Self {
        Self::new(DEFAULT_NUMERIC_KEYS.iter().copied())
    }
}

impl SpecParser {
    pub fn new<I, S>(numeric_keys: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            numeric_keys: numeric_keys.into_iter().map(Into::into).collect(),
        }
    }

    pub fn numeric_keys(&self) -> &[String] {
        &self.numeric_keys
    }

    /// Parse a typed list of transformation strings.
    pub fn parse<S: AsRef<str>>(&self, raw: &[S]) -> Result<Vec<TransformationDescriptor>> {
        raw.iter().map(|s| self.parse_one(s.as_ref())).collect()
    }

    /// Parse untyped request input.
    ///
    /// Anything other than an array is rejected, as is any array element
    /// that is not a string.
    pub fn parse_value(&self, raw: &serde_json::Value) -> Result<Vec<TransformationDescriptor>> {
        let items = raw
            .as_array()
            .ok_or_else(|| Error::invalid("transformations must be specified as an array"))?;
        items
            .iter()
            .map(|item| match item.as_str() {
                Some(s) => self.parse_one(s),
                None => Err(Error::invalid(format!("invalid transformation: {item}"))),
            })
            .collect()
    }

    /// Parse a single `NAME[:KEY=VALUE,...]` element.
    pub fn parse_one(&self, raw: &str) -> Result<TransformationDescriptor> {
        let bad = |why: &str| Error::invalid(format!("invalid transformation '{raw}': {why}"));

        let (name, rest) = match raw.split_once(':') {
            Some((name, rest)) => (name, Some(rest)),
            None => (raw, None),
        };
        if name.is_empty() {
            return Err(bad("missing name"));
        }

        let mut descriptor = TransformationDescriptor::new(name);
        let Some(rest) = rest else {
            return Ok(descriptor);
        };

        for pair in rest.split(',') {
            let (key, value) = pair
                .split_once('=')
                .ok_or_else(|| bad(&format!("parameter '{pair}' is not KEY=VALUE")))?;
            if key.is_empty() {
                return Err(bad("empty parameter name"));
            }
            let value = if self.is_numeric(key) {
                let n = value
                    .trim()
                    .parse::<i64>()
                    .map_err(|_| bad(&format!("'{key}' must be an integer, got '{value}'")))?;
                ParamValue::Int(n)
            } else {
                ParamValue::Str(value.to_string())
            };
            descriptor.params.insert(key, value);
        }
        Ok(descriptor)
    }

    fn is_numeric(&self, key: &str) -> bool {
        self.numeric_keys.iter().any(|k| k == key)
    }
}
