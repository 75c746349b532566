//! Slash commands for interactive mode

/// Result of parsing a slash command
#[derive(Debug, PartialEq, Eq)]
pub enum CommandResult {
    /// Show a message to the user (not sent to the assistant)
    Message(String),
    /// Select a project, or show the current one
    Project(Option<String>),
    /// Switch model, or show the current one
    Model(Option<String>),
    /// Print the retained transcript
    History,
    /// Exit the application
    Exit,
    /// Unknown command
    Unknown(String),
}

/// Parse a slash command. Returns `None` for ordinary chat input.
pub fn parse_command(input: &str) -> Option<CommandResult> {
    let input = input.trim();
    let rest = input.strip_prefix('/')?;

    let mut parts = rest.splitn(2, ' ');
    let command = parts.next().unwrap_or("").to_lowercase();
    let args = parts
        .next()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string);

    Some(match command.as_str() {
        "help" | "h" | "?" => CommandResult::Message(help_message()),
        "quit" | "exit" | "q" => CommandResult::Exit,
        "project" | "p" => CommandResult::Project(args),
        "model" | "m" => CommandResult::Model(args),
        "history" => CommandResult::History,
        _ => CommandResult::Unknown(command),
    })
}

fn help_message() -> String {
    r#"Available commands:
  /help, /h, /?          Show this help message
  /project, /p [id]      Show or select the project
  /model, /m [name]      Show or switch the model
  /history               Print the conversation so far
  /quit, /exit, /q       Exit scribe

Press Ctrl-C while an answer is streaming to cancel it."#
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_text_is_not_a_command() {
        assert_eq!(parse_command("hello /exit"), None);
    }

    #[test]
    fn test_exit_aliases() {
        for input in ["/exit", "/quit", "/q", "  /EXIT  "] {
            assert_eq!(parse_command(input), Some(CommandResult::Exit));
        }
    }

    #[test]
    fn test_project_with_and_without_argument() {
        assert_eq!(
            parse_command("/project  p-42 "),
            Some(CommandResult::Project(Some("p-42".into())))
        );
        assert_eq!(parse_command("/p"), Some(CommandResult::Project(None)));
    }

    #[test]
    fn test_unknown() {
        assert_eq!(
            parse_command("/frobnicate now"),
            Some(CommandResult::Unknown("frobnicate".into()))
        );
    }
}
