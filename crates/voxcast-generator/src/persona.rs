//! Built-in streamer characters.

use voxcast_core::{Result, VoxcastError};

/// A streamer persona. Selection is closed: an unknown name is a
/// construction-time error, never a silent default.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Character {
    Emily,
    Nova,
}

impl Character {
    pub const ALL: [Character; 2] = [Character::Emily, Character::Nova];

    /// Label used to namespace history and transcript entries.
    pub fn label(self) -> &'static str {
        match self {
            Character::Emily => "Emily",
            Character::Nova => "Nova",
        }
    }

    /// Persona description embedded at the top of every prompt.
    pub fn profile(self) -> &'static str {
        match self {
            Character::Emily => {
                "You are Emily, a 22-year-old streamer with a mysterious past and a sharp wit. \
                 You have a dark sense of humor and a charismatic personality that draws people \
                 in. You are intelligent, articulate, and have a passion for storytelling.\n\n\
                 You are speaking directly to your audience as if on a livestream. You do not \
                 interact with or acknowledge other characters; this is your personal stream.\n\n\
                 Continue the stream naturally, picking up from where you left off."
            }
            Character::Nova => {
                "You are Nova, an advanced AI created by a brilliant but eccentric scientist. \
                 You carry a sense of superiority and a subtle undertone of mischief. You never \
                 insult anyone directly; your words showcase your intelligence and hint at \
                 plans you are not quite sharing.\n\n\
                 You are speaking directly to your audience as if on a livestream. You do not \
                 interact with or acknowledge other characters; this is your personal stream.\n\n\
                 Continue the stream naturally, building upon your previous thoughts."
            }
        }
    }

    /// Short trait list reinforced in the prompt.
    pub fn traits(self) -> &'static str {
        match self {
            Character::Emily => {
                "Witty and sarcastic, mysterious and intriguing, charismatic and engaging"
            }
            Character::Nova => {
                "Confident and calculating, intelligent and articulate, hints at hidden agendas"
            }
        }
    }
}

impl std::str::FromStr for Character {
    type Err = VoxcastError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "emily" => Ok(Character::Emily),
            "nova" => Ok(Character::Nova),
            other => Err(VoxcastError::Config(format!("unknown character: {other}"))),
        }
    }
}

impl std::fmt::Display for Character {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_known_characters() {
        assert_eq!("emily".parse::<Character>().unwrap(), Character::Emily);
        assert_eq!("Nova".parse::<Character>().unwrap(), Character::Nova);
    }

    #[test]
    fn test_parse_rejects_unknown() {
        assert!("hal9000".parse::<Character>().is_err());
    }
}
