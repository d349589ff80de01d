use indexmap::IndexMap;
use std::collections::HashMap;

use crate::error::Result;
use crate::script::Value;

/// Variables and partials visible while one file is processed.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Context {
    vars: HashMap<String, Value>,
    partials: HashMap<String, String>,
}

impl Context {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds the base context of a run from prompt answers.
    ///
    /// # Arguments
    /// * `answers` - Host values keyed by prompt name
    ///
    /// # Returns
    /// * `Result<Context>` - The context, or a marshal error naming the offending answer
    pub fn from_answers(answers: &IndexMap<String, serde_json::Value>) -> Result<Self> {
        let mut context = Self::new();
        for (name, answer) in answers {
            let value = Value::from_host(answer).map_err(|e| match e {
                crate::error::Error::MarshalError(msg) => {
                    crate::error::Error::MarshalError(format!("answer '{name}': {msg}"))
                }
                other => other,
            })?;
            context.set_var(name.clone(), value);
        }
        Ok(context)
    }

    pub fn set_var(&mut self, name: impl Into<String>, value: Value) {
        self.vars.insert(name.into(), value);
    }

    pub fn var(&self, name: &str) -> Option<&Value> {
        self.vars.get(name)
    }

    pub fn set_partial(&mut self, name: impl Into<String>, text: impl Into<String>) {
        self.partials.insert(name.into(), text.into());
    }

    pub fn partials(&self) -> &HashMap<String, String> {
        &self.partials
    }

    /// Snapshot of the variables as the `vars` dictionary, with sorted keys.
    pub fn vars_value(&self) -> Value {
        let mut names: Vec<&String> = self.vars.keys().collect();
        names.sort();
        Value::Dict(
            names
                .into_iter()
                .map(|name| (Value::String(name.clone()), self.vars[name].clone()))
                .collect(),
        )
    }

    /// Projects the variables into template data.
    pub fn to_data(&self) -> serde_json::Value {
        self.vars_value().to_data()
    }
}
