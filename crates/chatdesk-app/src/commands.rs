//! Input line parsing for the terminal front-end.
//!
//! Anything that does not start with `/` is a chat message.

/// A user gesture entered at the prompt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Send(String),
    Attach(String),
    Dismiss,
    /// 1-based sidebar position.
    Recall(usize),
    Open,
    Close,
    Help,
    Quit,
    Invalid(String),
}

pub const HELP: &str = "\
Type a message and press Enter to send it.
  /attach <file>  attach a file (only its name is kept)
  /dismiss        remove the attached file
  /recall <n>     show only sidebar entry n
  /open, /close   show or hide the chat panel
  /quit           exit";

pub fn parse(line: &str) -> Command {
    let Some(rest) = line.trim_start().strip_prefix('/') else {
        return Command::Send(line.to_string());
    };

    let (name, arg) = match rest.split_once(char::is_whitespace) {
        Some((name, arg)) => (name, arg.trim()),
        None => (rest.trim(), ""),
    };

    match name {
        "attach" | "upload" if !arg.is_empty() => Command::Attach(arg.to_string()),
        "attach" | "upload" => Command::Invalid("usage: /attach <file>".to_string()),
        "dismiss" => Command::Dismiss,
        "recall" => match arg.parse::<usize>() {
            Ok(n) if n > 0 => Command::Recall(n),
            _ => Command::Invalid("usage: /recall <n>, n starting at 1".to_string()),
        },
        "open" => Command::Open,
        "close" => Command::Close,
        "help" => Command::Help,
        "quit" | "exit" => Command::Quit,
        other => Command::Invalid(format!("unknown command: /{}", other)),
    }
}
