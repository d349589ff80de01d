//! Dynamically typed values shared by the script, host and template layers.

use indexmap::IndexMap;
use std::fmt;
use std::hash::{Hash, Hasher};

use crate::error::{Error, Result};

/// A script value.
///
/// Values are immutable once built; cloning is the only way to share them
/// between contexts.
#[derive(Debug, Clone)]
pub enum Value {
    None,
    Bool(bool),
    Int(i64),
    Float(f64),
    String(String),
    List(Vec<Value>),
    Tuple(Vec<Value>),
    Dict(IndexMap<Value, Value>),
}

impl Value {
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::None => "NoneType",
            Value::Bool(_) => "bool",
            Value::Int(_) => "int",
            Value::Float(_) => "float",
            Value::String(_) => "string",
            Value::List(_) => "list",
            Value::Tuple(_) => "tuple",
            Value::Dict(_) => "dict",
        }
    }

    /// Truthiness as used by `skipif`, `if` and the boolean operators.
    pub fn truth(&self) -> bool {
        match self {
            Value::None => false,
            Value::Bool(b) => *b,
            Value::Int(i) => *i != 0,
            Value::Float(f) => *f != 0.0,
            Value::String(s) => !s.is_empty(),
            Value::List(items) | Value::Tuple(items) => !items.is_empty(),
            Value::Dict(map) => !map.is_empty(),
        }
    }

    /// Whether the value may be used as a dict key.
    pub fn is_hashable(&self) -> bool {
        match self {
            Value::List(_) | Value::Dict(_) => false,
            Value::Float(f) => !f.is_nan(),
            Value::Tuple(items) => items.iter().all(Value::is_hashable),
            _ => true,
        }
    }

    /// The quoted representation, as `repr()` would print it.
    pub fn repr(&self) -> String {
        match self {
            Value::String(s) => quote(s),
            other => other.to_string(),
        }
    }

    /// Converts a host answer into a script value.
    ///
    /// Only strings, integers, booleans and lists of strings have a script
    /// counterpart; everything else is a marshal error.
    pub fn from_host(value: &serde_json::Value) -> Result<Value> {
        match value {
            serde_json::Value::String(s) => Ok(Value::String(s.clone())),
            serde_json::Value::Bool(b) => Ok(Value::Bool(*b)),
            serde_json::Value::Number(n) => n.as_i64().map(Value::Int).ok_or_else(|| {
                Error::MarshalError(format!("unsupported host number '{n}'"))
            }),
            serde_json::Value::Array(items) => items
                .iter()
                .map(|item| match item {
                    serde_json::Value::String(s) => Ok(Value::String(s.clone())),
                    other => Err(Error::MarshalError(format!(
                        "unsupported list element '{other}', only strings are allowed"
                    ))),
                })
                .collect::<Result<Vec<_>>>()
                .map(Value::List),
            serde_json::Value::Null => {
                Err(Error::MarshalError("unsupported host value 'null'".to_string()))
            }
            serde_json::Value::Object(_) => {
                Err(Error::MarshalError("unsupported host value of type object".to_string()))
            }
        }
    }

    /// Projects the value into plain template data.
    pub fn to_data(&self) -> serde_json::Value {
        match self {
            Value::None => serde_json::Value::String(String::new()),
            Value::Bool(b) => serde_json::Value::Bool(*b),
            Value::Int(i) => serde_json::Value::Number((*i).into()),
            Value::Float(f) => serde_json::Value::String(format_float(*f)),
            Value::String(s) => serde_json::Value::String(s.clone()),
            Value::List(items) | Value::Tuple(items) => {
                serde_json::Value::Array(items.iter().map(Value::to_data).collect())
            }
            Value::Dict(map) => serde_json::Value::Object(
                map.iter().map(|(k, v)| (k.key_string(), v.to_data())).collect(),
            ),
        }
    }

    /// Stringified form of a dict key; tuple keys are joined by a single space.
    pub fn key_string(&self) -> String {
        match self {
            Value::Tuple(items) => {
                items.iter().map(Value::key_string).collect::<Vec<_>>().join(" ")
            }
            Value::None => String::new(),
            Value::Bool(b) => b.to_string(),
            Value::Float(f) => format_float(*f),
            other => other.to_string(),
        }
    }

    pub(crate) fn as_number(&self) -> Option<f64> {
        match self {
            Value::Int(i) => Some(*i as f64),
            Value::Float(f) => Some(*f),
            _ => None,
        }
    }
}

/// Formats a float the way template output expects it: shortest
/// round-trip digits, switching to an exponent below 1e-4 and from 1e21 up.
pub fn format_float(f: f64) -> String {
    if f.is_nan() {
        return "NaN".to_string();
    }
    if f.is_infinite() {
        return if f > 0.0 { "+Inf" } else { "-Inf" }.to_string();
    }
    if f == 0.0 {
        return if f.is_sign_negative() { "-0" } else { "0" }.to_string();
    }
    let scientific = format!("{f:e}");
    let Some((mantissa, exponent)) = scientific.split_once('e') else {
        return f.to_string();
    };
    let exponent: i32 = exponent.parse().unwrap_or(0);
    if (-4..21).contains(&exponent) {
        f.to_string()
    } else {
        let sign = if exponent < 0 { '-' } else { '+' };
        format!("{mantissa}e{sign}{:02}", exponent.abs())
    }
}

fn quote(s: &str) -> String {
    let mut out = String::with_capacity(s.len() + 2);
    out.push('"');
    for c in s.chars() {
        match c {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\t' => out.push_str("\\t"),
            '\r' => out.push_str("\\r"),
            c => out.push(c),
        }
    }
    out.push('"');
    out
}

fn write_seq(f: &mut fmt::Formatter<'_>, items: &[Value]) -> fmt::Result {
    for (i, item) in items.iter().enumerate() {
        if i > 0 {
            f.write_str(", ")?;
        }
        f.write_str(&item.repr())?;
    }
    Ok(())
}

/// `str()` semantics: strings print bare, containers print their elements' `repr`.
impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::None => f.write_str("None"),
            Value::Bool(true) => f.write_str("True"),
            Value::Bool(false) => f.write_str("False"),
            Value::Int(i) => write!(f, "{i}"),
            Value::Float(x) => write!(f, "{x:?}"),
            Value::String(s) => f.write_str(s),
            Value::List(items) => {
                f.write_str("[")?;
                write_seq(f, items)?;
                f.write_str("]")
            }
            Value::Tuple(items) => {
                f.write_str("(")?;
                write_seq(f, items)?;
                if items.len() == 1 {
                    f.write_str(",")?;
                }
                f.write_str(")")
            }
            Value::Dict(map) => {
                f.write_str("{")?;
                for (i, (k, v)) in map.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{}: {}", k.repr(), v.repr())?;
                }
                f.write_str("}")
            }
        }
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::None, Value::None) => true,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Int(a), Value::Int(b)) => a == b,
            (Value::Int(_) | Value::Float(_), Value::Int(_) | Value::Float(_)) => {
                self.as_number() == other.as_number()
            }
            (Value::String(a), Value::String(b)) => a == b,
            (Value::List(a), Value::List(b)) | (Value::Tuple(a), Value::Tuple(b)) => a == b,
            (Value::Dict(a), Value::Dict(b)) => a == b,
            _ => false,
        }
    }
}

impl Eq for Value {}

impl Hash for Value {
    fn hash<H: Hasher>(&self, state: &mut H) {
        match self {
            Value::None => 0u8.hash(state),
            Value::Bool(b) => {
                1u8.hash(state);
                b.hash(state);
            }
            // Numbers compare as f64, so they hash as f64 with zeros folded together.
            Value::Int(_) | Value::Float(_) => {
                2u8.hash(state);
                let n = self.as_number().unwrap_or_default();
                let n = if n == 0.0 { 0.0 } else { n };
                n.to_bits().hash(state);
            }
            Value::String(s) => {
                4u8.hash(state);
                s.hash(state);
            }
            Value::Tuple(items) => {
                5u8.hash(state);
                items.hash(state);
            }
            Value::List(_) => 6u8.hash(state),
            Value::Dict(_) => 7u8.hash(state),
        }
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(s)
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Value::Int(i)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_float() {
        assert_eq!(format_float(1.0), "1");
        assert_eq!(format_float(2.5), "2.5");
        assert_eq!(format_float(0.1), "0.1");
        assert_eq!(format_float(1e21), "1e+21");
        assert_eq!(format_float(0.00001), "1e-05");
        assert_eq!(format_float(123456.789), "123456.789");
        assert_eq!(format_float(-0.5), "-0.5");
    }

    #[test]
    fn test_key_string_joins_tuples() {
        let key = Value::Tuple(vec![Value::from("a"), Value::Int(1), Value::Bool(true)]);
        assert_eq!(key.key_string(), "a 1 true");
    }

    #[test]
    fn test_int_and_float_keys_coincide() {
        let mut map = IndexMap::new();
        map.insert(Value::Int(1), Value::from("int"));
        map.insert(Value::Float(1.0), Value::from("float"));
        assert_eq!(map.len(), 1);
        assert_eq!(map.get(&Value::Int(1)), Some(&Value::from("float")));
    }

    #[test]
    fn test_equal_numbers_hash_alike() {
        use std::collections::hash_map::DefaultHasher;

        let hash = |value: &Value| {
            let mut hasher = DefaultHasher::new();
            value.hash(&mut hasher);
            hasher.finish()
        };
        let big = Value::Int(1 << 62);
        let big_float = Value::Float((1u64 << 62) as f64);
        assert_eq!(big, big_float);
        assert_eq!(hash(&big), hash(&big_float));
        assert_eq!(hash(&Value::Float(-0.0)), hash(&Value::Int(0)));
    }

    #[test]
    fn test_nan_is_not_a_key() {
        assert!(!Value::Float(f64::NAN).is_hashable());
        assert!(!Value::Tuple(vec![Value::Int(1), Value::Float(f64::NAN)]).is_hashable());
        assert!(Value::Float(2.5).is_hashable());
    }
}
