//! Prompt assembly: a fixed system prompt followed by one rendered user-prompt
//! block per appended item.

use crate::error::TemplateError;
use minijinja::{Environment, UndefinedBehavior};
use serde::Serialize;

const USER_TEMPLATE_NAME: &str = "user";

pub const DEFAULT_SYSTEM_PROMPT: &str = include_str!("../templates/system_prompt.txt");
pub const DEFAULT_USER_PROMPT_TEMPLATE: &str = include_str!("../templates/user_prompt.j2");

pub struct PromptBuilder {
    system_prompt: String,
    env: Environment<'static>,
    user_prompt: String,
}

impl PromptBuilder {
    pub fn new(
        system_prompt: impl Into<String>,
        user_template: impl Into<String>,
    ) -> Result<Self, TemplateError> {
        let mut env = Environment::new();
        env.set_undefined_behavior(UndefinedBehavior::Strict);
        env.set_keep_trailing_newline(true);
        env.add_template_owned(USER_TEMPLATE_NAME, user_template.into())?;
        Ok(Self {
            system_prompt: system_prompt.into(),
            env,
            user_prompt: String::new(),
        })
    }

    pub fn with_defaults() -> Result<Self, TemplateError> {
        Self::new(DEFAULT_SYSTEM_PROMPT, DEFAULT_USER_PROMPT_TEMPLATE)
    }

    /// Render the user template with `item` as its context and append it.
    pub fn append<S: Serialize>(&mut self, item: &S) -> Result<&mut Self, TemplateError> {
        let rendered = self.env.get_template(USER_TEMPLATE_NAME)?.render(item)?;
        self.user_prompt.push_str(&rendered);
        Ok(self)
    }

    /// Drop everything appended so far, keeping the templates.
    pub fn reset(&mut self) {
        self.user_prompt.clear();
    }

    pub fn build(&self) -> String {
        format!("{}{}", self.system_prompt, self.user_prompt)
    }
}
