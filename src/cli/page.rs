//! Line commands accepted by an interactive page.

use crate::entity::NoteId;
use crate::error::{Result, TabnotesError};

pub const PAGE_HELP: &str = "\
Commands:
  add [text]        create a note (writer)
  edit <id> <text>  replace a note's text (writer)
  rm <id>           remove a note (writer)
  save              save pending edits now (writer)
  show              print the page
  help              show this help
  quit              leave the page";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PageCommand {
    Add(String),
    Edit(NoteId, String),
    Remove(NoteId),
    Save,
    Show,
    Help,
    Quit,
}

impl PageCommand {
    /// Parse one input line. Blank lines yield `None`.
    pub fn parse(line: &str) -> Result<Option<PageCommand>> {
        let line = line.trim();
        if line.is_empty() {
            return Ok(None);
        }

        let (word, rest) = match line.split_once(char::is_whitespace) {
            Some((word, rest)) => (word, rest.trim_start()),
            None => (line, ""),
        };

        let command = match word {
            "add" => PageCommand::Add(rest.to_string()),
            "edit" => {
                let (id, text) = match rest.split_once(char::is_whitespace) {
                    Some((id, text)) => (id, text.trim_start()),
                    None => (rest, ""),
                };
                PageCommand::Edit(parse_id(id)?, text.to_string())
            }
            "rm" | "remove" => PageCommand::Remove(parse_id(rest)?),
            "save" => PageCommand::Save,
            "show" => PageCommand::Show,
            "help" | "?" => PageCommand::Help,
            "quit" | "exit" => PageCommand::Quit,
            other => {
                return Err(TabnotesError::InvalidCommand(format!(
                    "unknown command '{}', try 'help'",
                    other
                )))
            }
        };
        Ok(Some(command))
    }
}

fn parse_id(raw: &str) -> Result<NoteId> {
    raw.trim()
        .parse()
        .map_err(|_| TabnotesError::InvalidCommand(format!("'{}' is not a note id", raw.trim())))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_add() {
        assert_eq!(
            PageCommand::parse("add").unwrap(),
            Some(PageCommand::Add(String::new()))
        );
        assert_eq!(
            PageCommand::parse("add buy  milk").unwrap(),
            Some(PageCommand::Add("buy  milk".to_string()))
        );
    }

    #[test]
    fn test_parse_edit_keeps_inner_spacing() {
        assert_eq!(
            PageCommand::parse("edit 3 hello   world").unwrap(),
            Some(PageCommand::Edit(NoteId(3), "hello   world".to_string()))
        );
        assert_eq!(
            PageCommand::parse("edit 3").unwrap(),
            Some(PageCommand::Edit(NoteId(3), String::new()))
        );
    }

    #[test]
    fn test_parse_remove() {
        assert_eq!(
            PageCommand::parse("rm 12").unwrap(),
            Some(PageCommand::Remove(NoteId(12)))
        );
        assert!(PageCommand::parse("rm twelve").is_err());
        assert!(PageCommand::parse("rm").is_err());
    }

    #[test]
    fn test_parse_simple_words() {
        assert_eq!(PageCommand::parse("  save ").unwrap(), Some(PageCommand::Save));
        assert_eq!(PageCommand::parse("show").unwrap(), Some(PageCommand::Show));
        assert_eq!(PageCommand::parse("?").unwrap(), Some(PageCommand::Help));
        assert_eq!(PageCommand::parse("exit").unwrap(), Some(PageCommand::Quit));
        assert_eq!(PageCommand::parse("   ").unwrap(), None);
    }

    #[test]
    fn test_parse_unknown() {
        let err = PageCommand::parse("frobnicate").unwrap_err();
        assert!(err.to_string().contains("frobnicate"));
    }
}
