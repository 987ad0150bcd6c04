//! A scripted console for tests.

use std::collections::VecDeque;

use async_trait::async_trait;

use crate::application::session::Console;

/// Answers prompts from a fixed script and records everything printed.
///
/// When the script runs out, `read_line` reports end of input, which ends
/// the session the same way closing the terminal would.
#[derive(Debug, Default)]
pub struct ScriptedConsole {
    input: VecDeque<String>,
    prompts: Vec<String>,
    output: Vec<String>,
}

impl ScriptedConsole {
    pub fn new<I, S>(lines: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            input: lines.into_iter().map(Into::into).collect(),
            ..Self::default()
        }
    }

    /// Every prompt shown, in order.
    pub fn prompts(&self) -> &[String] {
        &self.prompts
    }

    /// Every line printed, in order.
    pub fn output(&self) -> &[String] {
        &self.output
    }

    pub fn printed(&self, line: &str) -> bool {
        self.output.iter().any(|l| l == line)
    }
}

#[async_trait]
impl Console for ScriptedConsole {
    async fn read_line(&mut self, prompt: &str) -> Option<String> {
        self.prompts.push(prompt.to_string());
        self.input.pop_front()
    }

    fn print(&mut self, line: &str) {
        self.output.push(line.to_string());
    }
}
