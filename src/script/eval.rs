//! Tree-walking interpreter for parsed tag bodies.

use indexmap::IndexMap;
use std::cmp::Ordering;
use std::collections::HashMap;

use super::ast::{Arg, BinaryOp, Expr, ExprKind, Stmt, StmtKind, Target, UnaryOp};
use super::builtins::{self, Fallible};
use super::value::Value;
use super::EvalError;

/// Upper bound on statements and loop iterations executed by one body.
const MAX_STEPS: usize = 1_000_000;

/// Upper bound on the length of sequences built by repetition or `range`.
pub(crate) const MAX_SEQUENCE: usize = 1_000_000;

/// Name of the read-only snapshot of context variables.
const VARS: &str = "vars";

enum Flow {
    Normal,
    Return(Value),
    Break,
    Continue,
}

pub(crate) struct Interpreter<'a> {
    vars: &'a Value,
    locals: HashMap<String, Value>,
    steps: usize,
}

impl<'a> Interpreter<'a> {
    pub(crate) fn new(vars: &'a Value) -> Self {
        Self { vars, locals: HashMap::new(), steps: 0 }
    }

    /// Runs a function body; falling off the end returns `None`.
    pub(crate) fn run(&mut self, body: &[Stmt]) -> Result<Value, EvalError> {
        match self.exec_block(body)? {
            Flow::Return(value) => Ok(value),
            _ => Ok(Value::None),
        }
    }

    fn tick(&mut self, line: usize) -> Result<(), EvalError> {
        self.steps += 1;
        if self.steps > MAX_STEPS {
            return Err(EvalError::runtime(line, "execution step limit exceeded"));
        }
        Ok(())
    }

    fn exec_block(&mut self, stmts: &[Stmt]) -> Result<Flow, EvalError> {
        for stmt in stmts {
            match self.exec(stmt)? {
                Flow::Normal => {}
                other => return Ok(other),
            }
        }
        Ok(Flow::Normal)
    }

    fn exec(&mut self, stmt: &Stmt) -> Result<Flow, EvalError> {
        let line = stmt.line;
        self.tick(line)?;
        match &stmt.kind {
            StmtKind::Expr(expr) => {
                self.eval(expr)?;
            }
            StmtKind::Assign { target, value } => {
                let value = self.eval(value)?;
                self.assign(target, value, line)?;
            }
            StmtKind::AugAssign { target, op, value } => {
                let current = match target {
                    Target::Name(name) => self.lookup(name, line)?,
                    Target::Index { name, index } => {
                        let container = self.lookup(name, line)?;
                        let index = self.eval(index)?;
                        index_value(&container, &index).map_err(|e| EvalError::runtime(line, e))?
                    }
                    Target::Tuple(_) => {
                        return Err(EvalError::runtime(line, "invalid augmented assignment"))
                    }
                };
                let rhs = self.eval(value)?;
                let updated = binary(*op, current, rhs).map_err(|e| EvalError::runtime(line, e))?;
                self.assign(target, updated, line)?;
            }
            StmtKind::Return(expr) => {
                let value = match expr {
                    Some(expr) => self.eval(expr)?,
                    None => Value::None,
                };
                return Ok(Flow::Return(value));
            }
            StmtKind::Pass => {}
            StmtKind::Break => return Ok(Flow::Break),
            StmtKind::Continue => return Ok(Flow::Continue),
            StmtKind::If { branches, otherwise } => {
                for (condition, body) in branches {
                    if self.eval(condition)?.truth() {
                        return self.exec_block(body);
                    }
                }
                return self.exec_block(otherwise);
            }
            StmtKind::For { target, iter, body } => {
                let iterable = self.eval(iter)?;
                let items = iterate(iterable).map_err(|e| EvalError::runtime(iter.line, e))?;
                for item in items {
                    self.tick(line)?;
                    self.assign(target, item, line)?;
                    match self.exec_block(body)? {
                        Flow::Break => break,
                        Flow::Return(value) => return Ok(Flow::Return(value)),
                        Flow::Normal | Flow::Continue => {}
                    }
                }
            }
        }
        Ok(Flow::Normal)
    }

    fn check_bindable(&self, name: &str, line: usize) -> Result<(), EvalError> {
        if name == VARS {
            return Err(EvalError::runtime(line, "cannot reassign read-only 'vars'"));
        }
        if builtins::is_builtin(name) {
            return Err(EvalError::runtime(line, format!("cannot reassign built-in '{name}'")));
        }
        Ok(())
    }

    fn assign(&mut self, target: &Target, value: Value, line: usize) -> Result<(), EvalError> {
        match target {
            Target::Name(name) => {
                self.check_bindable(name, line)?;
                self.locals.insert(name.clone(), value);
            }
            Target::Tuple(targets) => {
                let items = match value {
                    Value::List(items) | Value::Tuple(items) => items,
                    other => {
                        return Err(EvalError::runtime(
                            line,
                            format!("got {} in sequence assignment", other.type_name()),
                        ))
                    }
                };
                if items.len() != targets.len() {
                    return Err(EvalError::runtime(
                        line,
                        format!(
                            "too {} values to unpack (got {}, want {})",
                            if items.len() > targets.len() { "many" } else { "few" },
                            items.len(),
                            targets.len()
                        ),
                    ));
                }
                for (target, item) in targets.iter().zip(items) {
                    self.assign(target, item, line)?;
                }
            }
            Target::Index { name, index } => {
                self.check_bindable(name, line)?;
                let index = self.eval(index)?;
                let Some(container) = self.locals.get_mut(name) else {
                    return Err(EvalError::runtime(line, format!("undefined: {name}")));
                };
                set_index(container, index, value).map_err(|e| EvalError::runtime(line, e))?;
            }
        }
        Ok(())
    }

    fn lookup(&self, name: &str, line: usize) -> Result<Value, EvalError> {
        if let Some(value) = self.locals.get(name) {
            return Ok(value.clone());
        }
        if name == VARS {
            return Ok(self.vars.clone());
        }
        if builtins::is_builtin(name) {
            return Err(EvalError::runtime(line, format!("built-in '{name}' must be called")));
        }
        Err(EvalError::runtime(line, format!("undefined: {name}")))
    }

    fn eval(&mut self, expr: &Expr) -> Result<Value, EvalError> {
        let line = expr.line;
        let fail = |msg: String| EvalError::runtime(line, msg);
        match &expr.kind {
            ExprKind::Literal(value) => Ok(value.clone()),
            ExprKind::Name(name) => self.lookup(name, line),
            ExprKind::List(items) => Ok(Value::List(self.eval_all(items)?)),
            ExprKind::Tuple(items) => Ok(Value::Tuple(self.eval_all(items)?)),
            ExprKind::Dict(entries) => {
                let mut map = IndexMap::with_capacity(entries.len());
                for (key, value) in entries {
                    let key = self.eval(key)?;
                    if !key.is_hashable() {
                        return Err(fail(format!("unhashable type: {}", key.type_name())));
                    }
                    let value = self.eval(value)?;
                    map.insert(key, value);
                }
                Ok(Value::Dict(map))
            }
            ExprKind::ListComp { element, target, iter, condition } => {
                let iterable = self.eval(iter)?;
                let items = iterate(iterable).map_err(fail)?;
                let saved = self.locals.clone();
                let result = self.comprehension(element, target, condition.as_deref(), items, line);
                self.locals = saved;
                result.map(Value::List)
            }
            ExprKind::Unary { op, operand } => {
                let value = self.eval(operand)?;
                unary(*op, value).map_err(fail)
            }
            ExprKind::Binary { op, left, right } => {
                let left = self.eval(left)?;
                let right = self.eval(right)?;
                binary(*op, left, right).map_err(fail)
            }
            ExprKind::And(left, right) => {
                let left = self.eval(left)?;
                if left.truth() {
                    self.eval(right)
                } else {
                    Ok(left)
                }
            }
            ExprKind::Or(left, right) => {
                let left = self.eval(left)?;
                if left.truth() {
                    Ok(left)
                } else {
                    self.eval(right)
                }
            }
            ExprKind::Conditional { condition, then, otherwise } => {
                if self.eval(condition)?.truth() {
                    self.eval(then)
                } else {
                    self.eval(otherwise)
                }
            }
            ExprKind::Index { object, index } => {
                let object = self.eval(object)?;
                let index = self.eval(index)?;
                index_value(&object, &index).map_err(fail)
            }
            ExprKind::Slice { object, start, stop, step } => {
                let object = self.eval(object)?;
                let start = self.eval_bound(start.as_deref())?;
                let stop = self.eval_bound(stop.as_deref())?;
                let step = self.eval_bound(step.as_deref())?;
                slice_value(&object, start, stop, step).map_err(fail)
            }
            ExprKind::Attribute { object, name } => {
                let object = self.eval(object)?;
                Err(fail(format!(
                    "{} has no field {name}; only method calls are supported",
                    object.type_name()
                )))
            }
            ExprKind::Call { callee, args } => self.call(callee, args, line),
        }
    }

    fn eval_all(&mut self, exprs: &[Expr]) -> Result<Vec<Value>, EvalError> {
        exprs.iter().map(|e| self.eval(e)).collect()
    }

    fn eval_bound(&mut self, expr: Option<&Expr>) -> Result<Option<i64>, EvalError> {
        let Some(expr) = expr else { return Ok(None) };
        match self.eval(expr)? {
            Value::None => Ok(None),
            Value::Int(i) => Ok(Some(i)),
            other => Err(EvalError::runtime(
                expr.line,
                format!("slice indices must be int, not {}", other.type_name()),
            )),
        }
    }

    fn comprehension(
        &mut self,
        element: &Expr,
        target: &Target,
        condition: Option<&Expr>,
        items: Vec<Value>,
        line: usize,
    ) -> Result<Vec<Value>, EvalError> {
        let mut out = Vec::new();
        for item in items {
            self.tick(line)?;
            self.assign(target, item, line)?;
            if let Some(condition) = condition {
                if !self.eval(condition)?.truth() {
                    continue;
                }
            }
            out.push(self.eval(element)?);
        }
        Ok(out)
    }

    fn call(&mut self, callee: &Expr, args: &[Arg], line: usize) -> Result<Value, EvalError> {
        let mut positional = Vec::new();
        let mut keywords = Vec::new();
        for arg in args {
            match arg {
                Arg::Positional(expr) => positional.push(self.eval(expr)?),
                Arg::Keyword(name, expr) => keywords.push((name.clone(), self.eval(expr)?)),
            }
        }

        match &callee.kind {
            ExprKind::Name(name) if builtins::is_builtin(name) => {
                builtins::call(name, positional, keywords).map_err(|e| EvalError::runtime(line, e))
            }
            ExprKind::Attribute { object, name } => {
                if let ExprKind::Name(variable) = &object.kind {
                    if matches!(name.as_str(), "append" | "extend") {
                        if let Some(Value::List(items)) = self.locals.get_mut(variable) {
                            return list_mutation(items, name, positional, keywords)
                                .map_err(|e| EvalError::runtime(line, e));
                        }
                    }
                }
                let receiver = self.eval(object)?;
                builtins::call_method(&receiver, name, positional, keywords)
                    .map_err(|e| EvalError::runtime(line, e))
            }
            _ => {
                let value = self.eval(callee)?;
                Err(EvalError::runtime(
                    line,
                    format!("invalid call of non-function ({})", value.type_name()),
                ))
            }
        }
    }
}

fn list_mutation(
    items: &mut Vec<Value>,
    method: &str,
    args: Vec<Value>,
    kwargs: Vec<(String, Value)>,
) -> Fallible<Value> {
    if !kwargs.is_empty() || args.len() != 1 {
        return Err(format!("list.{method}: want exactly one positional argument"));
    }
    let arg = args.into_iter().next().unwrap_or(Value::None);
    if method == "append" {
        items.push(arg);
    } else {
        items.extend(iterate(arg)?);
    }
    if items.len() > MAX_SEQUENCE {
        return Err(format!("list.{method}: list exceeds the limit of {MAX_SEQUENCE} elements"));
    }
    Ok(Value::None)
}

/// Materializes an iterable value; dicts iterate over their keys.
pub(crate) fn iterate(value: Value) -> Fallible<Vec<Value>> {
    match value {
        Value::List(items) | Value::Tuple(items) => Ok(items),
        Value::Dict(map) => Ok(map.into_keys().collect()),
        other => Err(format!("{} value is not iterable", other.type_name())),
    }
}

fn unary(op: UnaryOp, value: Value) -> Fallible<Value> {
    match (op, value) {
        (UnaryOp::Not, value) => Ok(Value::Bool(!value.truth())),
        (UnaryOp::Neg, Value::Int(i)) => {
            i.checked_neg().map(Value::Int).ok_or_else(|| "integer overflow".to_string())
        }
        (UnaryOp::Neg, Value::Float(f)) => Ok(Value::Float(-f)),
        (UnaryOp::Pos, value @ (Value::Int(_) | Value::Float(_))) => Ok(value),
        (op, value) => Err(format!(
            "unsupported unary operation {}{}",
            if op == UnaryOp::Neg { "-" } else { "+" },
            value.type_name()
        )),
    }
}

pub(crate) fn binary(op: BinaryOp, left: Value, right: Value) -> Fallible<Value> {
    match op {
        BinaryOp::Eq => return Ok(Value::Bool(left == right)),
        BinaryOp::NotEq => return Ok(Value::Bool(left != right)),
        BinaryOp::Lt | BinaryOp::Le | BinaryOp::Gt | BinaryOp::Ge => {
            let ordering = compare(&left, &right)?;
            return Ok(Value::Bool(match op {
                BinaryOp::Lt => ordering.is_lt(),
                BinaryOp::Le => ordering.is_le(),
                BinaryOp::Gt => ordering.is_gt(),
                _ => ordering.is_ge(),
            }));
        }
        BinaryOp::In => return contains(&right, &left).map(Value::Bool),
        BinaryOp::NotIn => return contains(&right, &left).map(|hit| Value::Bool(!hit)),
        _ => {}
    }

    let unsupported = |left: &Value, right: &Value| {
        format!(
            "unsupported binary operation {} {} {}",
            left.type_name(),
            op.symbol(),
            right.type_name()
        )
    };

    match (left, right) {
        (Value::Int(a), Value::Int(b)) => arith_int(op, a, b),
        (a @ (Value::Int(_) | Value::Float(_)), b @ (Value::Int(_) | Value::Float(_))) => {
            match (a.as_number(), b.as_number()) {
                (Some(x), Some(y)) => arith_float(op, x, y),
                _ => Err(unsupported(&a, &b)),
            }
        }
        (Value::String(a), Value::String(b)) if op == BinaryOp::Add => Ok(Value::String(a + &b)),
        (Value::String(format), args) if op == BinaryOp::Mod => {
            percent_format(&format, args).map(Value::String)
        }
        (Value::List(mut a), Value::List(b)) if op == BinaryOp::Add => {
            a.extend(b);
            Ok(Value::List(a))
        }
        (Value::Tuple(mut a), Value::Tuple(b)) if op == BinaryOp::Add => {
            a.extend(b);
            Ok(Value::Tuple(a))
        }
        (Value::String(s), Value::Int(n)) | (Value::Int(n), Value::String(s))
            if op == BinaryOp::Mul =>
        {
            let count = repeat_count(s.len(), n)?;
            Ok(Value::String(s.repeat(count)))
        }
        (Value::List(items), Value::Int(n)) | (Value::Int(n), Value::List(items))
            if op == BinaryOp::Mul =>
        {
            let count = repeat_count(items.len(), n)?;
            Ok(Value::List(repeat_items(&items, count)))
        }
        (Value::Tuple(items), Value::Int(n)) | (Value::Int(n), Value::Tuple(items))
            if op == BinaryOp::Mul =>
        {
            let count = repeat_count(items.len(), n)?;
            Ok(Value::Tuple(repeat_items(&items, count)))
        }
        (a, b) => Err(unsupported(&a, &b)),
    }
}

fn repeat_count(len: usize, n: i64) -> Fallible<usize> {
    if n <= 0 {
        return Ok(0);
    }
    let count = n as usize;
    match len.checked_mul(count) {
        Some(total) if total <= MAX_SEQUENCE => Ok(count),
        _ => Err(format!("repetition exceeds the limit of {MAX_SEQUENCE} elements")),
    }
}

fn repeat_items(items: &[Value], count: usize) -> Vec<Value> {
    let mut out = Vec::with_capacity(items.len() * count);
    for _ in 0..count {
        out.extend_from_slice(items);
    }
    out
}

fn arith_int(op: BinaryOp, a: i64, b: i64) -> Fallible<Value> {
    let overflow = || "integer overflow".to_string();
    match op {
        BinaryOp::Add => a.checked_add(b).map(Value::Int).ok_or_else(overflow),
        BinaryOp::Sub => a.checked_sub(b).map(Value::Int).ok_or_else(overflow),
        BinaryOp::Mul => a.checked_mul(b).map(Value::Int).ok_or_else(overflow),
        BinaryOp::Div => {
            if b == 0 {
                return Err("division by zero".to_string());
            }
            Ok(Value::Float(a as f64 / b as f64))
        }
        BinaryOp::FloorDiv => {
            if b == 0 {
                return Err("integer division by zero".to_string());
            }
            let quotient = a.checked_div(b).ok_or_else(overflow)?;
            let floored = if a % b != 0 && ((a < 0) != (b < 0)) { quotient - 1 } else { quotient };
            Ok(Value::Int(floored))
        }
        BinaryOp::Mod => {
            if b == 0 {
                return Err("integer modulo by zero".to_string());
            }
            let remainder = a.checked_rem(b).ok_or_else(overflow)?;
            let floored =
                if remainder != 0 && ((remainder < 0) != (b < 0)) { remainder + b } else { remainder };
            Ok(Value::Int(floored))
        }
        other => Err(format!("unsupported binary operation int {} int", other.symbol())),
    }
}

fn arith_float(op: BinaryOp, a: f64, b: f64) -> Fallible<Value> {
    match op {
        BinaryOp::Add => Ok(Value::Float(a + b)),
        BinaryOp::Sub => Ok(Value::Float(a - b)),
        BinaryOp::Mul => Ok(Value::Float(a * b)),
        BinaryOp::Div | BinaryOp::FloorDiv | BinaryOp::Mod if b == 0.0 => {
            Err("floating-point division by zero".to_string())
        }
        BinaryOp::Div => Ok(Value::Float(a / b)),
        BinaryOp::FloorDiv => Ok(Value::Float((a / b).floor())),
        BinaryOp::Mod => {
            let remainder = a % b;
            Ok(Value::Float(
                if remainder != 0.0 && ((remainder < 0.0) != (b < 0.0)) {
                    remainder + b
                } else {
                    remainder
                },
            ))
        }
        other => Err(format!("unsupported binary operation float {} float", other.symbol())),
    }
}

/// Orders two values of comparable kinds.
pub(crate) fn compare(left: &Value, right: &Value) -> Fallible<Ordering> {
    match (left, right) {
        (Value::Int(a), Value::Int(b)) => Ok(a.cmp(b)),
        (Value::Int(_) | Value::Float(_), Value::Int(_) | Value::Float(_)) => {
            match (left.as_number(), right.as_number()) {
                (Some(a), Some(b)) => Ok(a.partial_cmp(&b).unwrap_or(Ordering::Equal)),
                _ => Ok(Ordering::Equal),
            }
        }
        (Value::String(a), Value::String(b)) => Ok(a.cmp(b)),
        (Value::Bool(a), Value::Bool(b)) => Ok(a.cmp(b)),
        (Value::List(a), Value::List(b)) | (Value::Tuple(a), Value::Tuple(b)) => {
            for (x, y) in a.iter().zip(b) {
                if x != y {
                    return compare(x, y);
                }
            }
            Ok(a.len().cmp(&b.len()))
        }
        _ => Err(format!("cannot compare {} with {}", left.type_name(), right.type_name())),
    }
}

fn contains(container: &Value, item: &Value) -> Fallible<bool> {
    match container {
        Value::String(s) => match item {
            Value::String(sub) => Ok(s.contains(sub.as_str())),
            other => Err(format!(
                "'in <string>' requires string as left operand, not {}",
                other.type_name()
            )),
        },
        Value::List(items) | Value::Tuple(items) => Ok(items.contains(item)),
        Value::Dict(map) => {
            if !item.is_hashable() {
                return Err(format!("unhashable type: {}", item.type_name()));
            }
            Ok(map.contains_key(item))
        }
        other => Err(format!("unsupported operation 'in' on {}", other.type_name())),
    }
}

fn normalize_index(index: i64, len: usize) -> Option<usize> {
    let len = len as i64;
    let index = if index < 0 { index + len } else { index };
    (0..len).contains(&index).then_some(index as usize)
}

pub(crate) fn index_value(object: &Value, index: &Value) -> Fallible<Value> {
    match object {
        Value::List(items) | Value::Tuple(items) => {
            let Value::Int(i) = index else {
                return Err(format!(
                    "{} index must be int, not {}",
                    object.type_name(),
                    index.type_name()
                ));
            };
            normalize_index(*i, items.len())
                .map(|i| items[i].clone())
                .ok_or_else(|| format!("index {i} out of range [0:{}]", items.len()))
        }
        Value::String(s) => {
            let Value::Int(i) = index else {
                return Err(format!("string index must be int, not {}", index.type_name()));
            };
            let chars: Vec<char> = s.chars().collect();
            normalize_index(*i, chars.len())
                .map(|i| Value::String(chars[i].to_string()))
                .ok_or_else(|| format!("index {i} out of range [0:{}]", chars.len()))
        }
        Value::Dict(map) => {
            if !index.is_hashable() {
                return Err(format!("unhashable type: {}", index.type_name()));
            }
            map.get(index).cloned().ok_or_else(|| format!("key {} not in dict", index.repr()))
        }
        other => Err(format!("{} value is not subscriptable", other.type_name())),
    }
}

fn set_index(container: &mut Value, index: Value, value: Value) -> Fallible<()> {
    match container {
        Value::List(items) => {
            let Value::Int(i) = index else {
                return Err(format!("list index must be int, not {}", index.type_name()));
            };
            let len = items.len();
            let slot = normalize_index(i, len)
                .ok_or_else(|| format!("index {i} out of range [0:{len}]"))?;
            items[slot] = value;
            Ok(())
        }
        Value::Dict(map) => {
            if !index.is_hashable() {
                return Err(format!("unhashable type: {}", index.type_name()));
            }
            map.insert(index, value);
            Ok(())
        }
        other => Err(format!("{} value does not support item assignment", other.type_name())),
    }
}

fn slice_positions(len: usize, start: Option<i64>, stop: Option<i64>, step: i64) -> Vec<usize> {
    let len = len as i64;
    let mut positions = Vec::new();
    if step > 0 {
        let clamp = |i: i64| if i < 0 { i.saturating_add(len).max(0) } else { i.min(len) };
        let mut i = start.map_or(0, clamp);
        let end = stop.map_or(len, clamp);
        while i < end {
            positions.push(i as usize);
            let Some(next) = i.checked_add(step) else { break };
            i = next;
        }
    } else {
        let clamp = |i: i64| if i < 0 { i.saturating_add(len).max(-1) } else { i.min(len - 1) };
        let mut i = start.map_or(len - 1, clamp);
        let end = stop.map_or(-1, clamp);
        while i > end {
            positions.push(i as usize);
            let Some(next) = i.checked_add(step) else { break };
            i = next;
        }
    }
    positions
}

fn slice_value(
    object: &Value,
    start: Option<i64>,
    stop: Option<i64>,
    step: Option<i64>,
) -> Fallible<Value> {
    let step = step.unwrap_or(1);
    if step == 0 {
        return Err("slice step cannot be zero".to_string());
    }
    match object {
        Value::List(items) => Ok(Value::List(
            slice_positions(items.len(), start, stop, step)
                .into_iter()
                .map(|i| items[i].clone())
                .collect(),
        )),
        Value::Tuple(items) => Ok(Value::Tuple(
            slice_positions(items.len(), start, stop, step)
                .into_iter()
                .map(|i| items[i].clone())
                .collect(),
        )),
        Value::String(s) => {
            let chars: Vec<char> = s.chars().collect();
            Ok(Value::String(
                slice_positions(chars.len(), start, stop, step)
                    .into_iter()
                    .map(|i| chars[i])
                    .collect(),
            ))
        }
        other => Err(format!("{} value cannot be sliced", other.type_name())),
    }
}

/// `%`-style string formatting supporting `%s`, `%r`, `%d` and `%%`.
fn percent_format(format: &str, args: Value) -> Fallible<String> {
    let args = match args {
        Value::Tuple(items) => items,
        other => vec![other],
    };
    let mut args = args.into_iter();
    let mut out = String::with_capacity(format.len());
    let mut chars = format.chars();
    while let Some(c) = chars.next() {
        if c != '%' {
            out.push(c);
            continue;
        }
        let Some(conversion) = chars.next() else {
            return Err("incomplete format".to_string());
        };
        if conversion == '%' {
            out.push('%');
            continue;
        }
        let arg = args.next().ok_or_else(|| "not enough arguments for format string".to_string())?;
        match conversion {
            's' => out.push_str(&arg.to_string()),
            'r' => out.push_str(&arg.repr()),
            'd' => match arg {
                Value::Int(i) => out.push_str(&i.to_string()),
                Value::Float(f) => out.push_str(&(f.trunc() as i64).to_string()),
                other => return Err(format!("%d format requires integer: {}", other.type_name())),
            },
            other => return Err(format!("unsupported format character '{other}'")),
        }
    }
    if args.next().is_some() {
        return Err("too many arguments for format string".to_string());
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_floor_division_and_modulo() {
        assert_eq!(arith_int(BinaryOp::FloorDiv, -7, 2).unwrap(), Value::Int(-4));
        assert_eq!(arith_int(BinaryOp::Mod, -7, 2).unwrap(), Value::Int(1));
        assert_eq!(arith_int(BinaryOp::Mod, 7, -2).unwrap(), Value::Int(-1));
    }

    #[test]
    fn test_slice_positions() {
        assert_eq!(slice_positions(5, None, None, -1), vec![4, 3, 2, 1, 0]);
        assert_eq!(slice_positions(5, Some(1), Some(-1), 2), vec![1, 3]);
        assert_eq!(slice_positions(3, Some(10), None, 1), Vec::<usize>::new());
    }

    #[test]
    fn test_slice_with_extreme_steps() {
        assert_eq!(slice_positions(3, Some(1), None, i64::MAX), vec![1]);
        assert_eq!(slice_positions(3, Some(1), None, i64::MIN), vec![1]);
        assert_eq!(slice_positions(3, Some(i64::MIN), None, 1), vec![0, 1, 2]);
        let sliced = slice_value(&Value::from("abc"), Some(1), None, Some(i64::MAX)).unwrap();
        assert_eq!(sliced, Value::from("b"));
    }

    #[test]
    fn test_percent_format() {
        let args = Value::Tuple(vec![Value::from("x"), Value::Int(3)]);
        assert_eq!(percent_format("%s=%d%%", args).unwrap(), "x=3%");
        assert!(percent_format("%s %s", Value::from("one")).is_err());
    }
}
