use std::path::PathBuf;

/// A line typed at the prompt.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Command {
    /// Select an image and analyze it.
    Image(PathBuf),
    /// Analyze the selected image again.
    Analyze,
    /// Clear the displayed history but keep the conversation.
    Clear,
    /// Forget the conversation entirely.
    Reset,
    Help,
    Quit,
    /// Anything else is a chat message.
    Message(String),
    Empty,
}

impl Command {
    pub fn parse(line: &str) -> Self {
        let line = line.trim();
        if line.is_empty() {
            return Command::Empty;
        }
        let Some(rest) = line.strip_prefix('/') else {
            return Command::Message(line.to_owned());
        };
        let (name, arg) = match rest.split_once(char::is_whitespace) {
            Some((name, arg)) => (name, arg.trim()),
            None => (rest, ""),
        };
        match (name, arg) {
            ("image" | "img", "") => Command::Help,
            ("image" | "img", path) => Command::Image(PathBuf::from(path)),
            ("analyze", "") => Command::Analyze,
            ("analyze", path) => Command::Image(PathBuf::from(path)),
            ("clear", _) => Command::Clear,
            ("reset", _) => Command::Reset,
            ("quit" | "exit", _) => Command::Quit,
            ("help", _) => Command::Help,
            // Not a known command, so the user probably meant to say it.
            _ => Command::Message(line.to_owned()),
        }
    }
}

pub const HELP: &str = "\
Commands:
  /image <path>    identify the plant in a photo
  /analyze         analyze the selected photo again
  /clear           clear the chat history (the assistant still remembers)
  /reset           start a brand new conversation
  /quit            leave
Anything else is sent to the assistant.";
