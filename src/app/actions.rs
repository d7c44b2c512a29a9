use thiserror::Error;

use crate::storage::NoteId;

/// A user action delivered to the editing loop.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EditorEvent {
    SetTitle(String),
    SetBody(String),
    /// Appends one line of text to the body.
    AppendLine(String),
    ManualSave,
    NewNote,
    Open(NoteId),
    Delete(NoteId),
    Status,
    Quit,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    #[error("unknown command :{0}")]
    UnknownCommand(String),

    #[error("command :{command} expects a note id, got {raw:?}")]
    InvalidId { command: String, raw: String },
}

/// Parses one line typed in the line editor.
///
/// Lines starting with `:` are commands (`:title`, `:body`, `:save`, `:new`,
/// `:open <id>`, `:delete <id>`, `:status`, `:quit`); `\:` escapes a literal
/// leading colon; anything else is body text.
pub fn parse_line(line: &str) -> Result<EditorEvent, ParseError> {
    let line = line.trim_end_matches(['\r', '\n']);
    if let Some(rest) = line.strip_prefix("\\:") {
        return Ok(EditorEvent::AppendLine(format!(":{rest}")));
    }
    let Some(command_line) = line.strip_prefix(':') else {
        return Ok(EditorEvent::AppendLine(line.to_string()));
    };

    let (command, arg) = match command_line.split_once(' ') {
        Some((command, arg)) => (command, arg),
        None => (command_line, ""),
    };
    let event = match command {
        "title" | "t" => EditorEvent::SetTitle(arg.to_string()),
        "body" | "b" => EditorEvent::SetBody(arg.to_string()),
        "save" | "w" => EditorEvent::ManualSave,
        "new" | "n" => EditorEvent::NewNote,
        "open" | "o" => EditorEvent::Open(parse_id(command, arg)?),
        "delete" | "d" => EditorEvent::Delete(parse_id(command, arg)?),
        "status" | "s" => EditorEvent::Status,
        "quit" | "q" => EditorEvent::Quit,
        other => return Err(ParseError::UnknownCommand(other.to_string())),
    };
    Ok(event)
}

fn parse_id(command: &str, raw: &str) -> Result<NoteId, ParseError> {
    raw.trim()
        .parse::<i64>()
        .map(NoteId)
        .map_err(|_| ParseError::InvalidId {
            command: command.to_string(),
            raw: raw.to_string(),
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    #[test]
    fn plain_lines_append_to_body() {
        assert_eq!(
            parse_line("hello world\n"),
            Ok(EditorEvent::AppendLine("hello world".into()))
        );
        assert_eq!(parse_line(""), Ok(EditorEvent::AppendLine(String::new())));
    }

    #[test]
    fn commands_and_aliases() {
        assert_eq!(
            parse_line(":title Weekly plan"),
            Ok(EditorEvent::SetTitle("Weekly plan".into()))
        );
        assert_eq!(parse_line(":w"), Ok(EditorEvent::ManualSave));
        assert_eq!(parse_line(":open 12"), Ok(EditorEvent::Open(NoteId(12))));
        assert_eq!(parse_line(":q"), Ok(EditorEvent::Quit));
        assert_eq!(parse_line(":body"), Ok(EditorEvent::SetBody(String::new())));
    }

    #[test]
    fn escaped_colon_is_text() {
        assert_eq!(
            parse_line("\\:not a command"),
            Ok(EditorEvent::AppendLine(":not a command".into()))
        );
    }

    #[test]
    fn bad_input_is_reported() {
        assert_matches!(parse_line(":frobnicate"), Err(ParseError::UnknownCommand(_)));
        assert_matches!(
            parse_line(":delete seven"),
            Err(ParseError::InvalidId { .. })
        );
    }
}
