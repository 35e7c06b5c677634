//! Interactive menu: one choice per run

use std::io::Write;

use eyre::Result;
use tokio::io::{AsyncBufRead, AsyncBufReadExt};

const MENU: &str = "
Choose an option:
1. Sync directory users into MongoDB
2. Search for a user
3. Exit

Your choice: ";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MenuChoice {
    Sync,
    Search,
    Exit,
    Invalid(String),
}

impl MenuChoice {
    pub fn parse(input: &str) -> Self {
        match input.trim() {
            "1" => MenuChoice::Sync,
            "2" => MenuChoice::Search,
            "3" => MenuChoice::Exit,
            other => MenuChoice::Invalid(other.to_string()),
        }
    }
}

/// Line-oriented prompts over any async reader
pub struct Prompt<R> {
    input: R,
}

impl<R: AsyncBufRead + Unpin> Prompt<R> {
    pub fn new(input: R) -> Self {
        Self { input }
    }

    /// Print `question` and read one line; end of input reads as empty
    pub async fn ask<W: Write>(&mut self, out: &mut W, question: &str) -> Result<String> {
        write!(out, "{}", question)?;
        out.flush()?;

        let mut line = String::new();
        self.input.read_line(&mut line).await?;
        Ok(line.trim_end_matches(['\r', '\n']).to_string())
    }

    pub async fn choose<W: Write>(&mut self, out: &mut W) -> Result<MenuChoice> {
        let answer = self.ask(out, MENU).await?;
        Ok(MenuChoice::parse(&answer))
    }
}
