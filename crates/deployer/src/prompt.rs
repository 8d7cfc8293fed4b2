use derive_more::{Display, Error, From};
use dialoguer::Input;

/// Operator prompt errors.
#[derive(Debug, Display, From, Error)]
pub(crate) enum PromptError {
    /// Terminal interaction error.
    #[display(fmt = "unable to read operator input: {}", _0)]
    Terminal(dialoguer::Error),
}

/// Source of operator answers.
pub(crate) trait Prompt {
    /// Ask the operator a question and return the answer.
    fn ask(&mut self, question: &str) -> Result<String, PromptError>;
}

/// Interactive terminal [`Prompt`].
pub(crate) struct Terminal;

impl Prompt for Terminal {
    fn ask(&mut self, question: &str) -> Result<String, PromptError> {
        let answer: String = Input::new().with_prompt(question).interact_text()?;

        Ok(answer.trim().to_owned())
    }
}
