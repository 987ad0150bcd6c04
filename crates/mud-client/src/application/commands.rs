//! The player's command vocabulary.
//!
//! A command line is a verb followed by an optional argument: everything
//! after the first run of whitespace, trimmed.  An argument the command
//! needs but the player left out is prompted for by the session, so parsing
//! never fails for a missing argument.

use std::fmt;
use std::str::FromStr;

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Look,
    Examine(String),
    Describe(String),
    Go(String),
    Say(String),
    Do(String),
    Talk(String),
    Change,
    Create(String),
    Destroy(String),
    Open(String),
    Close(String),
    Link(String),
    Dump(String),
    Quit,
    Help,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    #[error("type a command, or 'help' for a list")]
    Empty,

    #[error("unknown command '{0}'; type 'help' for a list")]
    Unknown(String),
}

impl FromStr for Command {
    type Err = ParseError;

    fn from_str(line: &str) -> Result<Self, Self::Err> {
        let line = line.trim();
        if line.is_empty() {
            return Err(ParseError::Empty);
        }
        let (verb, arg) = match line.split_once(char::is_whitespace) {
            Some((verb, rest)) => (verb, rest.trim().to_string()),
            None => (line, String::new()),
        };

        let command = match verb.to_ascii_lowercase().as_str() {
            "look" => Command::Look,
            "examine" => Command::Examine(arg),
            "describe" => Command::Describe(arg),
            "go" => Command::Go(arg),
            "say" => Command::Say(arg),
            "do" => Command::Do(arg),
            "talk" => Command::Talk(arg),
            "change" => Command::Change,
            "create" => Command::Create(arg),
            "destroy" => Command::Destroy(arg),
            "open" => Command::Open(arg),
            "close" => Command::Close(arg),
            "link" => Command::Link(arg),
            "dump" => Command::Dump(arg),
            "quit" => Command::Quit,
            "help" => Command::Help,
            _ => return Err(ParseError::Unknown(verb.to_string())),
        };
        Ok(command)
    }
}

impl Command {
    /// The verb as the player types it.
    pub fn verb(&self) -> &'static str {
        match self {
            Command::Look => "look",
            Command::Examine(_) => "examine",
            Command::Describe(_) => "describe",
            Command::Go(_) => "go",
            Command::Say(_) => "say",
            Command::Do(_) => "do",
            Command::Talk(_) => "talk",
            Command::Change => "change",
            Command::Create(_) => "create",
            Command::Destroy(_) => "destroy",
            Command::Open(_) => "open",
            Command::Close(_) => "close",
            Command::Link(_) => "link",
            Command::Dump(_) => "dump",
            Command::Quit => "quit",
            Command::Help => "help",
        }
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.verb())
    }
}

pub const HELP: &str = "\
Commands are:
  look               Look around
  examine <thing>    Examine the named thing in more detail
  describe <person>  Describe the named person
  go <direction>     Go in the named direction (i.e. through the named exit)
  say <message>      Say the specified text to everyone in the place
  do <action>        Perform the named action, e.g. 'do smiles'
  talk <person>      Talk to one person; you will be prompted for the message
  change             Change how you are described; you will be prompted
  create <thing>     Create a new thing in this place
  destroy <thing>    Destroy a thing
  open <direction>   Create an adjoining place; you will be prompted
  close <direction>  Close an exit from this place
  link <direction>   Link this place to another one, possibly on another server
  dump <filename>    Save the state of this world (password required)
  quit               Leave the game
  help               Display this message";
