use crate::error::UnsupportedCommand;
use crate::network::NetworkRequest;

/// One decoded channel message from the interpreter module.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Sync,
    Alert(String),
    Script(String),
    SetCursor(String),
    Page(String),
    Type(String),
    RawType(String),
    GetEvent,
    GetEvents,
    ReadLine,
    Http(NetworkRequest),
    Unsupported(UnsupportedCommand),
}

impl Command {
    pub fn prefix(&self) -> Option<char> {
        match self {
            Command::Sync => Some('s'),
            Command::Alert(_) => Some('a'),
            Command::Script(_) => Some('j'),
            Command::SetCursor(_) => Some('c'),
            Command::Page(_) => Some('p'),
            Command::Type(_) => Some('o'),
            Command::RawType(_) => Some('O'),
            Command::GetEvent => Some('i'),
            Command::GetEvents => Some('I'),
            Command::ReadLine => Some('r'),
            Command::Http(_) => Some('h'),
            Command::Unsupported(u) => u.prefix,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Command::Sync => "sync",
            Command::Alert(_) => "alert",
            Command::Script(_) => "script",
            Command::SetCursor(_) => "setcursor",
            Command::Page(_) => "page",
            Command::Type(_) => "type",
            Command::RawType(_) => "rawtype",
            Command::GetEvent => "getevent",
            Command::GetEvents => "getevents",
            Command::ReadLine => "readline",
            Command::Http(_) => "http",
            Command::Unsupported(_) => "unsupported",
        }
    }

    /// Whether the dispatcher owes the module a reply for this command.
    /// `ReadLine` replies later, when the line completes.
    pub fn expects_reply(&self) -> bool {
        matches!(
            self,
            Command::Sync
                | Command::GetEvent
                | Command::GetEvents
                | Command::ReadLine
                | Command::Http(_)
        )
    }

    /// Encode as a channel message. Used on the interpreter side of a link.
    pub fn encode(&self) -> String {
        let payload = match self {
            Command::Alert(p)
            | Command::Script(p)
            | Command::SetCursor(p)
            | Command::Page(p)
            | Command::Type(p)
            | Command::RawType(p) => p.clone(),
            Command::Http(request) => request.encode(),
            _ => String::new(),
        };
        match self.prefix() {
            Some(prefix) => format!("{}{}", prefix, payload),
            None => payload,
        }
    }
}

pub struct CommandParser;

impl CommandParser {
    /// Decode one message. Never fails; unknown prefixes become
    /// `Command::Unsupported`.
    pub fn parse(message: &str) -> Command {
        let mut chars = message.chars();
        let Some(prefix) = chars.next() else {
            return Command::Unsupported(UnsupportedCommand { prefix: None });
        };
        let rest = chars.as_str();

        match prefix {
            's' => Command::Sync,
            'a' => Command::Alert(rest.to_string()),
            'j' => Command::Script(rest.to_string()),
            'c' => Command::SetCursor(rest.to_string()),
            'p' => Command::Page(rest.to_string()),
            'o' => Command::Type(rest.to_string()),
            'O' => Command::RawType(rest.to_string()),
            'i' => Command::GetEvent,
            'I' => Command::GetEvents,
            'r' => Command::ReadLine,
            'h' => Command::Http(NetworkRequest::decode(rest)),
            other => Command::Unsupported(UnsupportedCommand {
                prefix: Some(other),
            }),
        }
    }
}
