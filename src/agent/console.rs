//! Operator console
//!
//! The loop's only channel to the human: prompts for input and prints the
//! conversation as it happens.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader, Lines, Stdin};

#[async_trait]
pub trait Console: Send {
    /// Show `prompt` and read one line. `None` means end of input.
    async fn read_line(&mut self, prompt: &str) -> std::io::Result<Option<String>>;

    /// Display one line of output
    fn show(&mut self, line: &str);
}

/// Console on the process's stdin/stdout
pub struct StdConsole {
    lines: Lines<BufReader<Stdin>>,
}

impl StdConsole {
    pub fn new() -> Self {
        Self {
            lines: BufReader::new(tokio::io::stdin()).lines(),
        }
    }
}

impl Default for StdConsole {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Console for StdConsole {
    async fn read_line(&mut self, prompt: &str) -> std::io::Result<Option<String>> {
        let mut stdout = tokio::io::stdout();
        stdout.write_all(format!("{} ", prompt).as_bytes()).await?;
        stdout.flush().await?;
        self.lines.next_line().await
    }

    fn show(&mut self, line: &str) {
        println!("{}", line);
    }
}

/// Console fed from a fixed script, recording everything shown.
///
/// Cloning shares the transcript, so a test can keep a handle after moving
/// the console into a loop.
#[derive(Clone, Default)]
pub struct ScriptedConsole {
    inputs: Arc<Mutex<VecDeque<String>>>,
    transcript: Arc<Mutex<Vec<String>>>,
}

impl ScriptedConsole {
    pub fn new<I, S>(inputs: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            inputs: Arc::new(Mutex::new(inputs.into_iter().map(Into::into).collect())),
            transcript: Arc::default(),
        }
    }

    pub fn transcript(&self) -> Vec<String> {
        self.transcript
            .lock()
            .map(|lines| lines.clone())
            .unwrap_or_default()
    }

    pub fn remaining_inputs(&self) -> usize {
        self.inputs.lock().map(|inputs| inputs.len()).unwrap_or(0)
    }
}

#[async_trait]
impl Console for ScriptedConsole {
    async fn read_line(&mut self, prompt: &str) -> std::io::Result<Option<String>> {
        let next = self
            .inputs
            .lock()
            .map_err(|_| std::io::Error::new(std::io::ErrorKind::Other, "console poisoned"))?
            .pop_front();
        if let Ok(mut transcript) = self.transcript.lock() {
            transcript.push(format!("{} {}", prompt, next.as_deref().unwrap_or("<eof>")));
        }
        Ok(next)
    }

    fn show(&mut self, line: &str) {
        if let Ok(mut transcript) = self.transcript.lock() {
            transcript.push(line.to_string());
        }
    }
}
