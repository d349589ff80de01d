//! User prompting for generator inputs.
//! Answers are collected in declaration order and later marshalled into the
//! base context of the run.

use dialoguer::{Confirm, Input, MultiSelect, Select};
use indexmap::IndexMap;
use log::debug;

use crate::error::{Error, Result};

/// Interactive input primitives the prompts are built from.
pub trait Prompter {
    fn input(&self, message: &str, help: Option<&str>) -> Result<String>;

    fn integer(&self, message: &str, help: Option<&str>) -> Result<i64>;

    fn confirm(&self, message: &str, help: Option<&str>, default: bool) -> Result<bool>;

    /// Returns the index of the chosen option.
    fn select(&self, message: &str, help: Option<&str>, options: &[String]) -> Result<usize>;

    /// Returns the indices of the chosen options, in option order.
    fn multi_select(
        &self,
        message: &str,
        help: Option<&str>,
        options: &[String],
    ) -> Result<Vec<usize>>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PromptKind {
    Input,
    Integer,
    Confirm,
    Choice(Vec<String>),
    MultiChoice(Vec<String>),
}

/// A single question declared by a generator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Prompt {
    pub message: String,
    pub help: Option<String>,
    pub kind: PromptKind,
}

impl Prompt {
    /// Asks the question and returns the answer as a host value.
    ///
    /// # Arguments
    /// * `prompter` - Input backend
    ///
    /// # Returns
    /// * `Result<serde_json::Value>` - String, integer, boolean or list of strings
    pub fn ask(&self, prompter: &dyn Prompter) -> Result<serde_json::Value> {
        let help = self.help.as_deref();
        let answer = match &self.kind {
            PromptKind::Input => serde_json::Value::String(prompter.input(&self.message, help)?),
            PromptKind::Integer => prompter.integer(&self.message, help)?.into(),
            PromptKind::Confirm => prompter.confirm(&self.message, help, false)?.into(),
            PromptKind::Choice(options) => {
                let index = prompter.select(&self.message, help, options)?;
                let choice = options.get(index).ok_or_else(|| {
                    Error::PromptError(format!("selection {index} is out of range"))
                })?;
                serde_json::Value::String(choice.clone())
            }
            PromptKind::MultiChoice(options) => {
                let indices = prompter.multi_select(&self.message, help, options)?;
                let mut chosen = Vec::with_capacity(indices.len());
                for index in indices {
                    let choice = options.get(index).ok_or_else(|| {
                        Error::PromptError(format!("selection {index} is out of range"))
                    })?;
                    chosen.push(serde_json::Value::String(choice.clone()));
                }
                serde_json::Value::Array(chosen)
            }
        };
        Ok(answer)
    }
}

/// Asks every prompt in order.
pub fn ask_prompts(
    prompts: &IndexMap<String, Prompt>,
    prompter: &dyn Prompter,
) -> Result<IndexMap<String, serde_json::Value>> {
    let mut answers = IndexMap::with_capacity(prompts.len());
    for (name, prompt) in prompts {
        let answer = prompt.ask(prompter)?;
        debug!("Answer for '{name}': {answer}");
        answers.insert(name.clone(), answer);
    }
    Ok(answers)
}

/// Terminal prompter backed by dialoguer.
#[derive(Debug, Default)]
pub struct DialoguerPrompter;

impl DialoguerPrompter {
    pub fn new() -> Self {
        Self
    }

    fn with_help(message: &str, help: Option<&str>) -> String {
        match help {
            Some(help) if !help.is_empty() => format!("{message} ({help})"),
            _ => message.to_string(),
        }
    }
}

fn prompt_error(e: dialoguer::Error) -> Error {
    Error::PromptError(e.to_string())
}

impl Prompter for DialoguerPrompter {
    fn input(&self, message: &str, help: Option<&str>) -> Result<String> {
        Input::<String>::new()
            .with_prompt(Self::with_help(message, help))
            .allow_empty(true)
            .interact_text()
            .map_err(prompt_error)
    }

    fn integer(&self, message: &str, help: Option<&str>) -> Result<i64> {
        Input::<i64>::new()
            .with_prompt(Self::with_help(message, help))
            .interact_text()
            .map_err(prompt_error)
    }

    fn confirm(&self, message: &str, help: Option<&str>, default: bool) -> Result<bool> {
        Confirm::new()
            .with_prompt(Self::with_help(message, help))
            .default(default)
            .interact()
            .map_err(prompt_error)
    }

    fn select(&self, message: &str, help: Option<&str>, options: &[String]) -> Result<usize> {
        Select::new()
            .with_prompt(Self::with_help(message, help))
            .default(0)
            .items(options)
            .interact()
            .map_err(prompt_error)
    }

    fn multi_select(
        &self,
        message: &str,
        help: Option<&str>,
        options: &[String],
    ) -> Result<Vec<usize>> {
        MultiSelect::new()
            .with_prompt(Self::with_help(message, help))
            .items(options)
            .interact()
            .map_err(prompt_error)
    }
}
