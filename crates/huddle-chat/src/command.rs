//! Parsing typed chat input.

use crate::RouterError;

const MSG_USAGE: &str = "usage: /msg <nick> <message>";

/// What a line of typed chat asks for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChatCommand {
    /// Plain text for everyone.
    Broadcast { body: String },
    /// `/msg <target> <body>`.
    Directed { target: String, body: String },
}

impl ChatCommand {
    /// Interprets one line.
    ///
    /// Only `/msg` is a command; any other text, slash or not, is a
    /// broadcast. `/msg` needs a target and a non-empty body.
    ///
    /// ```rust
    /// use huddle_chat::ChatCommand;
    ///
    /// assert_eq!(
    ///     ChatCommand::parse("/msg Nick2 see you at the door").unwrap(),
    ///     ChatCommand::Directed {
    ///         target: "Nick2".into(),
    ///         body: "see you at the door".into(),
    ///     }
    /// );
    /// assert!(ChatCommand::parse("/msg Nick2").is_err());
    /// ```
    pub fn parse(text: &str) -> Result<Self, RouterError> {
        let line = text.trim();
        let Some(args) = line.strip_prefix("/msg") else {
            return Ok(Self::Broadcast { body: line.to_owned() });
        };
        // "/msgfoo" is not the command.
        if !args.is_empty() && !args.starts_with(char::is_whitespace) {
            return Ok(Self::Broadcast { body: line.to_owned() });
        }

        let (target, body) = args
            .trim_start()
            .split_once(char::is_whitespace)
            .ok_or_else(|| RouterError::Usage(MSG_USAGE.into()))?;
        let body = body.trim();
        if body.is_empty() {
            return Err(RouterError::Usage(MSG_USAGE.into()));
        }
        Ok(Self::Directed {
            target: target.to_owned(),
            body: body.to_owned(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_plain_text_is_broadcast() {
        assert_eq!(
            ChatCommand::parse("  hello all ").unwrap(),
            ChatCommand::Broadcast {
                body: "hello all".into()
            }
        );
    }

    #[test]
    fn test_parse_msg_keeps_inner_spacing_of_body() {
        assert_eq!(
            ChatCommand::parse("/msg  Nick2   a  b").unwrap(),
            ChatCommand::Directed {
                target: "Nick2".into(),
                body: "a  b".into()
            }
        );
    }

    #[test]
    fn test_parse_msg_without_args_is_usage_error() {
        assert!(matches!(
            ChatCommand::parse("/msg"),
            Err(RouterError::Usage(_))
        ));
        assert!(matches!(
            ChatCommand::parse("/msg   "),
            Err(RouterError::Usage(_))
        ));
    }

    #[test]
    fn test_parse_msg_without_body_is_usage_error() {
        assert!(matches!(
            ChatCommand::parse("/msg Nick2   "),
            Err(RouterError::Usage(_))
        ));
    }

    #[test]
    fn test_parse_msg_prefix_of_word_is_broadcast() {
        assert_eq!(
            ChatCommand::parse("/msgs are great").unwrap(),
            ChatCommand::Broadcast {
                body: "/msgs are great".into()
            }
        );
    }

    #[test]
    fn test_parse_other_slash_is_broadcast() {
        assert!(matches!(
            ChatCommand::parse("/shrug").unwrap(),
            ChatCommand::Broadcast { .. }
        ));
    }
}
