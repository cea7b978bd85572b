//! Commit inputs: where extra context comes from and the message goes to.

use std::io::{self, Write};
use std::path::{Path, PathBuf};

/// The commit message field of the host.
pub trait CommitInput: Send + Sync {
    /// Text the user already typed, used as extra context.
    fn read(&self) -> Option<String>;

    /// Replace the field's content with `message`.
    fn write(&self, message: &str) -> io::Result<()>;
}

/// A commit message file, as handed to the `prepare-commit-msg` hook.
///
/// Lines starting with `#` are git's instructions, not user text, and
/// nothing below the scissors line is read.
#[derive(Debug, Clone)]
pub struct MessageFile {
    path: PathBuf,
}

impl MessageFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

/// `git commit -v` puts the staged diff below this marker line.
fn is_scissors(line: &str) -> bool {
    line.starts_with("# ") && line.contains(">8")
}

fn strip_comments(content: &str) -> String {
    content
        .lines()
        .take_while(|line| !is_scissors(line))
        .filter(|line| !line.starts_with('#'))
        .collect::<Vec<_>>()
        .join("\n")
        .trim()
        .to_string()
}

impl CommitInput for MessageFile {
    fn read(&self) -> Option<String> {
        let content = std::fs::read_to_string(&self.path).ok()?;
        let text = strip_comments(&content);
        (!text.is_empty()).then_some(text)
    }

    fn write(&self, message: &str) -> io::Result<()> {
        std::fs::write(&self.path, format!("{}\n", message.trim_end()))
    }
}

/// Prints the message to stdout; context comes from the command line.
#[derive(Debug, Default)]
pub struct StdoutInput {
    context: Option<String>,
}

impl StdoutInput {
    pub fn new(context: Option<String>) -> Self {
        Self { context }
    }
}

impl CommitInput for StdoutInput {
    fn read(&self) -> Option<String> {
        self.context.clone()
    }

    fn write(&self, message: &str) -> io::Result<()> {
        let mut stdout = io::stdout().lock();
        writeln!(stdout, "{}", message)?;
        stdout.flush()
    }
}
