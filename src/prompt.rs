use crate::error::{Result, RetrieverError};
use std::io::{BufRead, Write};
use std::str::FromStr;

/// Interactive fallback for run parameters not supplied on the command line.
pub struct Prompter<R, W> {
    input: R,
    output: W,
}

impl<R: BufRead, W: Write> Prompter<R, W> {
    pub fn new(input: R, output: W) -> Self {
        Self { input, output }
    }

    pub fn into_output(self) -> W {
        self.output
    }

    /// Print `question`, read one line, return it trimmed. EOF is an error.
    pub fn ask(&mut self, question: &str) -> Result<String> {
        write!(self.output, "{question}")?;
        self.output.flush()?;
        let mut line = String::new();
        if self.input.read_line(&mut line)? == 0 {
            return Err(RetrieverError::InvalidInput(format!(
                "no answer given for '{}'",
                question.trim_end_matches([':', ' '])
            )));
        }
        Ok(line.trim().to_string())
    }

    /// Like `ask`, but an empty answer means "none".
    pub fn ask_optional(&mut self, question: &str) -> Result<Option<String>> {
        let answer = self.ask(question)?;
        Ok(Some(answer).filter(|a| !a.is_empty()))
    }

    pub fn ask_parsed<T>(&mut self, question: &str) -> Result<T>
    where
        T: FromStr,
        T::Err: std::fmt::Display,
    {
        let answer = self.ask(question)?;
        answer
            .parse()
            .map_err(|e| RetrieverError::InvalidInput(format!("'{answer}': {e}")))
    }
}
