//! Predeclared functions and methods available to tag bodies.

use chrono::format::{Item, StrftimeItems};
use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use std::fmt::Write;

use super::eval::{compare, iterate, MAX_SEQUENCE};
use super::value::Value;

pub(crate) type Fallible<T> = Result<T, String>;

static NONE: Value = Value::None;

const BUILTINS: [&str; 19] = [
    "abs",
    "all",
    "any",
    "bool",
    "enumerate",
    "float",
    "int",
    "len",
    "list",
    "max",
    "min",
    "range",
    "reversed",
    "sorted",
    "str",
    "strftime",
    "time",
    "tuple",
    "type",
];

pub(crate) fn is_builtin(name: &str) -> bool {
    BUILTINS.contains(&name)
}

/// Current UTC Unix timestamp.
pub fn now() -> i64 {
    Utc::now().timestamp()
}

/// Formats a UTC timestamp with a strftime pattern; `0` means now.
pub fn strftime(format: &str, timestamp: i64) -> Fallible<String> {
    let timestamp = if timestamp == 0 { now() } else { timestamp };
    let items: Vec<Item<'_>> = StrftimeItems::new(format).collect();
    if items.iter().any(|item| matches!(item, Item::Error)) {
        return Err(format!("strftime: invalid format string {format:?}"));
    }
    let datetime = DateTime::from_timestamp(timestamp, 0)
        .ok_or_else(|| format!("strftime: timestamp {timestamp} out of range"))?;
    let mut out = String::new();
    write!(out, "{}", datetime.format_with_items(items.iter()))
        .map_err(|_| format!("strftime: cannot format {format:?}"))?;
    Ok(out)
}

/// Binds positional and keyword arguments to parameter slots.
fn bind(
    function: &str,
    params: &[&str],
    required: usize,
    args: Vec<Value>,
    kwargs: Vec<(String, Value)>,
) -> Fallible<Vec<Option<Value>>> {
    if args.len() > params.len() {
        return Err(format!(
            "{function}: got {} arguments, want at most {}",
            args.len(),
            params.len()
        ));
    }
    let mut bound: Vec<Option<Value>> = args.into_iter().map(Some).collect();
    bound.resize(params.len(), None);
    for (key, value) in kwargs {
        let Some(slot) = params.iter().position(|p| *p == key) else {
            return Err(format!("{function}: unexpected keyword argument '{key}'"));
        };
        if bound[slot].is_some() {
            return Err(format!("{function}: got multiple values for parameter '{key}'"));
        }
        bound[slot] = Some(value);
    }
    if let Some(missing) = (0..required).find(|&i| bound[i].is_none()) {
        return Err(format!("{function}: missing argument for {}", params[missing]));
    }
    Ok(bound)
}

fn int_arg(function: &str, value: &Value) -> Fallible<i64> {
    match value {
        Value::Int(i) => Ok(*i),
        other => Err(format!("{function}: got {}, want int", other.type_name())),
    }
}

fn str_arg<'v>(function: &str, value: &'v Value) -> Fallible<&'v str> {
    match value {
        Value::String(s) => Ok(s.as_str()),
        other => Err(format!("{function}: got {}, want string", other.type_name())),
    }
}

pub(crate) fn call(name: &str, args: Vec<Value>, kwargs: Vec<(String, Value)>) -> Fallible<Value> {
    match name {
        "time" => {
            bind(name, &[], 0, args, kwargs)?;
            Ok(Value::Int(now()))
        }
        "strftime" => {
            let mut bound = bind(name, &["format", "time"], 1, args, kwargs)?;
            let format = bound[0].take().unwrap_or(Value::None);
            let timestamp = match bound[1].take() {
                None | Some(Value::None) => 0,
                Some(value) => int_arg(name, &value)?,
            };
            strftime(str_arg(name, &format)?, timestamp).map(Value::String)
        }
        "min" | "max" => extremum(name, args, kwargs),
        _ => {
            let mut bound = bind(name, params(name), required(name), args, kwargs)?;
            let mut arg = |i: usize| bound.get_mut(i).and_then(Option::take);
            call_simple(name, arg(0), arg(1), arg(2))
        }
    }
}

fn params(name: &str) -> &'static [&'static str] {
    match name {
        "range" => &["start", "stop", "step"],
        "sorted" => &["iterable", "reverse"],
        _ => &["x"],
    }
}

fn required(name: &str) -> usize {
    match name {
        "int" | "float" | "str" | "bool" | "list" | "tuple" => 0,
        _ => 1,
    }
}

fn call_simple(
    name: &str,
    first: Option<Value>,
    second: Option<Value>,
    third: Option<Value>,
) -> Fallible<Value> {
    match name {
        "len" => {
            let value = first.unwrap_or(Value::None);
            let len = match &value {
                Value::String(s) => s.chars().count(),
                Value::List(items) | Value::Tuple(items) => items.len(),
                Value::Dict(map) => map.len(),
                other => return Err(format!("len: value of type {} has no len", other.type_name())),
            };
            Ok(Value::Int(len as i64))
        }
        "str" => Ok(Value::String(first.map(|v| v.to_string()).unwrap_or_default())),
        "bool" => Ok(Value::Bool(first.is_some_and(|v| v.truth()))),
        "int" => to_int(first.unwrap_or(Value::Int(0))),
        "float" => to_float(first.unwrap_or(Value::Float(0.0))),
        "list" => Ok(Value::List(match first {
            Some(value) => iterate(value)?,
            None => Vec::new(),
        })),
        "tuple" => Ok(Value::Tuple(match first {
            Some(value) => iterate(value)?,
            None => Vec::new(),
        })),
        "type" => Ok(Value::from(first.unwrap_or(Value::None).type_name())),
        "abs" => match first {
            Some(Value::Int(i)) => {
                i.checked_abs().map(Value::Int).ok_or_else(|| "abs: integer overflow".to_string())
            }
            Some(Value::Float(f)) => Ok(Value::Float(f.abs())),
            Some(other) => Err(format!("abs: got {}, want int or float", other.type_name())),
            None => Err("abs: missing argument for x".to_string()),
        },
        "any" => Ok(Value::Bool(iterate(first.unwrap_or(Value::None))?.iter().any(Value::truth))),
        "all" => Ok(Value::Bool(iterate(first.unwrap_or(Value::None))?.iter().all(Value::truth))),
        "reversed" => {
            let mut items = iterate(first.unwrap_or(Value::None))?;
            items.reverse();
            Ok(Value::List(items))
        }
        "enumerate" => Ok(Value::List(
            iterate(first.unwrap_or(Value::None))?
                .into_iter()
                .enumerate()
                .map(|(i, v)| Value::Tuple(vec![Value::Int(i as i64), v]))
                .collect(),
        )),
        "sorted" => {
            let mut items = iterate(first.unwrap_or(Value::None))?;
            let mut failure = None;
            items.sort_by(|a, b| {
                compare(a, b).unwrap_or_else(|e| {
                    failure.get_or_insert(e);
                    std::cmp::Ordering::Equal
                })
            });
            if let Some(e) = failure {
                return Err(format!("sorted: {e}"));
            }
            if second.is_some_and(|r| r.truth()) {
                items.reverse();
            }
            Ok(Value::List(items))
        }
        "range" => range(first, second, third),
        other => Err(format!("undefined built-in '{other}'")),
    }
}

fn to_int(value: Value) -> Fallible<Value> {
    match value {
        Value::Int(i) => Ok(Value::Int(i)),
        Value::Bool(b) => Ok(Value::Int(i64::from(b))),
        Value::Float(f) if f.is_finite() && f.abs() < 9.2e18 => Ok(Value::Int(f.trunc() as i64)),
        Value::Float(f) => Err(format!("int: cannot convert {f} to int")),
        Value::String(s) => s
            .trim()
            .parse::<i64>()
            .map(Value::Int)
            .map_err(|_| format!("int: invalid literal {s:?}")),
        other => Err(format!("int: got {}, want number or string", other.type_name())),
    }
}

fn to_float(value: Value) -> Fallible<Value> {
    match value {
        Value::Int(i) => Ok(Value::Float(i as f64)),
        Value::Float(f) => Ok(Value::Float(f)),
        Value::Bool(b) => Ok(Value::Float(if b { 1.0 } else { 0.0 })),
        Value::String(s) => s
            .trim()
            .parse::<f64>()
            .map(Value::Float)
            .map_err(|_| format!("float: invalid literal {s:?}")),
        other => Err(format!("float: got {}, want number or string", other.type_name())),
    }
}

fn range(first: Option<Value>, second: Option<Value>, third: Option<Value>) -> Fallible<Value> {
    let first = int_arg("range", &first.unwrap_or(Value::None))?;
    let (start, stop) = match &second {
        Some(stop) => (first, int_arg("range", stop)?),
        None => (0, first),
    };
    let step = match &third {
        Some(step) => int_arg("range", step)?,
        None => 1,
    };
    if step == 0 {
        return Err("range: step argument must not be zero".to_string());
    }
    let span = if step > 0 { stop.saturating_sub(start) } else { start.saturating_sub(stop) };
    let count = if span <= 0 { 0 } else { (span - 1) / step.saturating_abs() + 1 };
    if count as usize > MAX_SEQUENCE {
        return Err(format!("range: {count} elements exceeds the limit of {MAX_SEQUENCE}"));
    }
    Ok(Value::List((0..count).map(|i| Value::Int(start + i * step)).collect()))
}

fn extremum(name: &str, args: Vec<Value>, kwargs: Vec<(String, Value)>) -> Fallible<Value> {
    if let Some((key, _)) = kwargs.first() {
        return Err(format!("{name}: unexpected keyword argument '{key}'"));
    }
    let items = match args.len() {
        0 => return Err(format!("{name}: missing argument")),
        1 => iterate(args.into_iter().next().unwrap_or(Value::None))?,
        _ => args,
    };
    let mut best: Option<Value> = None;
    for item in items {
        best = Some(match best {
            None => item,
            Some(current) => {
                let ordering = compare(&item, &current).map_err(|e| format!("{name}: {e}"))?;
                let better = if name == "min" { ordering.is_lt() } else { ordering.is_gt() };
                if better {
                    item
                } else {
                    current
                }
            }
        });
    }
    best.ok_or_else(|| format!("{name}: empty sequence"))
}

pub(crate) fn call_method(
    receiver: &Value,
    name: &str,
    args: Vec<Value>,
    kwargs: Vec<(String, Value)>,
) -> Fallible<Value> {
    match receiver {
        Value::String(s) => string_method(s, name, args, kwargs),
        Value::Dict(map) => dict_method(map, name, args, kwargs),
        other => Err(format!("{} has no method {name}", other.type_name())),
    }
}

fn string_method(
    s: &str,
    name: &str,
    args: Vec<Value>,
    kwargs: Vec<(String, Value)>,
) -> Fallible<Value> {
    let function = format!("string.{name}");
    let function = function.as_str();
    match name {
        "upper" | "lower" | "title" | "capitalize" => {
            bind(function, &[], 0, args, kwargs)?;
            Ok(Value::String(match name {
                "upper" => s.to_uppercase(),
                "lower" => s.to_lowercase(),
                "title" => title_case(s),
                _ => capitalize(s),
            }))
        }
        "strip" | "lstrip" | "rstrip" => {
            let mut bound = bind(function, &["chars"], 0, args, kwargs)?;
            let chars = match bound[0].take() {
                None | Some(Value::None) => None,
                Some(value) => Some(str_arg(function, &value)?.to_string()),
            };
            let matches = |c: char| match &chars {
                Some(set) => set.contains(c),
                None => c.is_whitespace(),
            };
            Ok(Value::from(match name {
                "strip" => s.trim_matches(matches),
                "lstrip" => s.trim_start_matches(matches),
                _ => s.trim_end_matches(matches),
            }))
        }
        "replace" => {
            let bound = bind(function, &["old", "new", "count"], 2, args, kwargs)?;
            let old = str_arg(function, bound[0].as_ref().unwrap_or(&NONE))?;
            let new = str_arg(function, bound[1].as_ref().unwrap_or(&NONE))?;
            let count = match &bound[2] {
                Some(value) => int_arg(function, value)?,
                None => -1,
            };
            Ok(Value::String(if count < 0 {
                s.replace(old, new)
            } else {
                s.replacen(old, new, count as usize)
            }))
        }
        "split" => {
            let bound = bind(function, &["sep", "maxsplit"], 0, args, kwargs)?;
            let maxsplit = match &bound[1] {
                Some(value) => int_arg(function, value)?,
                None => -1,
            };
            let parts: Vec<String> = match &bound[0] {
                None | Some(Value::None) => split_whitespace(s, maxsplit),
                Some(value) => {
                    let sep = str_arg(function, value)?;
                    if sep.is_empty() {
                        return Err(format!("{function}: empty separator"));
                    }
                    if maxsplit < 0 {
                        s.split(sep).map(str::to_string).collect()
                    } else {
                        s.splitn(maxsplit as usize + 1, sep).map(str::to_string).collect()
                    }
                }
            };
            Ok(Value::List(parts.into_iter().map(Value::String).collect()))
        }
        "join" => {
            let mut bound = bind(function, &["iterable"], 1, args, kwargs)?;
            let items = iterate(bound[0].take().unwrap_or(Value::None))?;
            let parts = items
                .iter()
                .map(|item| str_arg(function, item).map(str::to_string))
                .collect::<Fallible<Vec<_>>>()?;
            Ok(Value::String(parts.join(s)))
        }
        "startswith" | "endswith" => {
            let bound = bind(function, &["prefix"], 1, args, kwargs)?;
            let candidates = match bound[0].as_ref().unwrap_or(&NONE) {
                Value::Tuple(items) => items.clone(),
                other => vec![other.clone()],
            };
            for candidate in &candidates {
                let candidate = str_arg(function, candidate)?;
                let hit =
                    if name == "startswith" { s.starts_with(candidate) } else { s.ends_with(candidate) };
                if hit {
                    return Ok(Value::Bool(true));
                }
            }
            Ok(Value::Bool(false))
        }
        "find" => {
            let bound = bind(function, &["sub"], 1, args, kwargs)?;
            let sub = str_arg(function, bound[0].as_ref().unwrap_or(&NONE))?;
            Ok(Value::Int(
                s.find(sub).map_or(-1, |byte| s[..byte].chars().count() as i64),
            ))
        }
        "count" => {
            let bound = bind(function, &["sub"], 1, args, kwargs)?;
            let sub = str_arg(function, bound[0].as_ref().unwrap_or(&NONE))?;
            let count =
                if sub.is_empty() { s.chars().count() + 1 } else { s.matches(sub).count() };
            Ok(Value::Int(count as i64))
        }
        other => Err(format!("string has no method {other}")),
    }
}

fn dict_method(
    map: &IndexMap<Value, Value>,
    name: &str,
    args: Vec<Value>,
    kwargs: Vec<(String, Value)>,
) -> Fallible<Value> {
    let function = format!("dict.{name}");
    let function = function.as_str();
    match name {
        "get" => {
            let mut bound = bind(function, &["key", "default"], 1, args, kwargs)?;
            let key = bound[0].take().unwrap_or(Value::None);
            if !key.is_hashable() {
                return Err(format!("{function}: unhashable type: {}", key.type_name()));
            }
            Ok(match map.get(&key) {
                Some(value) => value.clone(),
                None => bound[1].take().unwrap_or(Value::None),
            })
        }
        "keys" => {
            bind(function, &[], 0, args, kwargs)?;
            Ok(Value::List(map.keys().cloned().collect()))
        }
        "values" => {
            bind(function, &[], 0, args, kwargs)?;
            Ok(Value::List(map.values().cloned().collect()))
        }
        "items" => {
            bind(function, &[], 0, args, kwargs)?;
            Ok(Value::List(
                map.iter().map(|(k, v)| Value::Tuple(vec![k.clone(), v.clone()])).collect(),
            ))
        }
        other => Err(format!("dict has no method {other}")),
    }
}

fn title_case(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut previous_is_letter = false;
    for c in s.chars() {
        if previous_is_letter {
            out.extend(c.to_lowercase());
        } else {
            out.extend(c.to_uppercase());
        }
        previous_is_letter = c.is_alphabetic();
    }
    out
}

fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars.flat_map(char::to_lowercase)).collect(),
        None => String::new(),
    }
}

fn split_whitespace(s: &str, maxsplit: i64) -> Vec<String> {
    let mut parts = Vec::new();
    let mut rest = s.trim_start();
    while !rest.is_empty() {
        if maxsplit >= 0 && parts.len() as i64 == maxsplit {
            parts.push(rest.to_string());
            break;
        }
        match rest.find(char::is_whitespace) {
            Some(end) => {
                parts.push(rest[..end].to_string());
                rest = rest[end..].trim_start();
            }
            None => {
                parts.push(rest.to_string());
                break;
            }
        }
    }
    parts
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strftime_fixed_timestamp() {
        assert_eq!(strftime("%Y-%m-%d %H:%M:%S", 86_400 + 3_661).unwrap(), "1970-01-02 01:01:01");
    }

    #[test]
    fn test_strftime_rejects_invalid_specifier() {
        assert!(strftime("%Q", 1).is_err());
    }

    #[test]
    fn test_split_whitespace_maxsplit() {
        assert_eq!(split_whitespace("  a b  c ", -1), vec!["a", "b", "c"]);
        assert_eq!(split_whitespace("a b  c ", 1), vec!["a", "b  c "]);
    }

    #[test]
    fn test_title_case() {
        assert_eq!(title_case("hello wORLD-foo"), "Hello World-Foo");
    }
}
