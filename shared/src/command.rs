use thiserror::Error;

/// Canonical direction names paired with their abbreviations.
pub const DIRECTIONS: [(&str, &str); 10] = [
    ("north", "n"),
    ("south", "s"),
    ("east", "e"),
    ("west", "w"),
    ("up", "u"),
    ("down", "d"),
    ("northeast", "ne"),
    ("northwest", "nw"),
    ("southeast", "se"),
    ("southwest", "sw"),
];

/// Maps a direction name or abbreviation to its canonical name.
pub fn expand_direction(word: &str) -> Option<&'static str> {
    DIRECTIONS
        .iter()
        .find(|(name, abbrev)| word == *name || word == *abbrev)
        .map(|(name, _)| *name)
}

/// One line of player input, classified.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Go(String),
    Look(Option<String>),
    Say(String),
    Emote(String),
    Shout(String),
    Whisper { target: String, message: String },
    Take(String),
    Drop(String),
    Inventory,
    Who,
    Attack(String),
    Help,
    Quit,
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ParseError {
    #[error("Empty command")]
    Empty,
    #[error("Unknown command '{0}'. Type 'help' for a list of commands.")]
    UnknownCommand(String),
    #[error("Usage: {usage}")]
    MissingArgument { usage: &'static str },
}

fn required(rest: &str, usage: &'static str) -> Result<String, ParseError> {
    if rest.is_empty() {
        Err(ParseError::MissingArgument { usage })
    } else {
        Ok(rest.to_string())
    }
}

impl Command {
    /// Parses a line: the first whitespace-delimited token is the verb
    /// (case-insensitive), the trimmed remainder is its argument.
    pub fn parse(line: &str) -> Result<Command, ParseError> {
        let line = line.trim();
        if line.is_empty() {
            return Err(ParseError::Empty);
        }

        // Single-character shorthands for speech and emotes
        if let Some(rest) = line.strip_prefix('\'') {
            return required(rest.trim(), "'<message>").map(Command::Say);
        }
        if let Some(rest) = line.strip_prefix(':') {
            return required(rest.trim(), ":<action>").map(Command::Emote);
        }

        let (verb, rest) = match line.split_once(char::is_whitespace) {
            Some((verb, rest)) => (verb, rest.trim()),
            None => (line, ""),
        };
        let verb = verb.to_lowercase();

        if let Some(direction) = expand_direction(&verb) {
            return Ok(Command::Go(direction.to_string()));
        }

        match verb.as_str() {
            "go" => {
                let exit = required(rest, "go <exit>")?.to_lowercase();
                let exit = expand_direction(&exit).map(str::to_string).unwrap_or(exit);
                Ok(Command::Go(exit))
            }
            "look" | "l" => Ok(Command::Look(
                (!rest.is_empty()).then(|| rest.to_string()),
            )),
            "say" => required(rest, "say <message>").map(Command::Say),
            "emote" => required(rest, "emote <action>").map(Command::Emote),
            "shout" => required(rest, "shout <message>").map(Command::Shout),
            "whisper" => match rest.split_once(char::is_whitespace) {
                Some((target, message)) if !message.trim().is_empty() => Ok(Command::Whisper {
                    target: target.to_string(),
                    message: message.trim().to_string(),
                }),
                _ => Err(ParseError::MissingArgument {
                    usage: "whisper <player> <message>",
                }),
            },
            "take" | "get" => required(rest, "take <item>").map(Command::Take),
            "drop" => required(rest, "drop <item>").map(Command::Drop),
            "inventory" | "inv" | "i" => Ok(Command::Inventory),
            "who" => Ok(Command::Who),
            "attack" | "kill" | "hit" => required(rest, "attack <player>").map(Command::Attack),
            "help" | "?" => Ok(Command::Help),
            "quit" => Ok(Command::Quit),
            _ => Err(ParseError::UnknownCommand(verb)),
        }
    }
}
