//! Parsing of REPL lines into commands.
//!
//! Indices typed by the user are 1-based; they are converted to 0-based here.

use std::path::PathBuf;

use retouch_core::{EditMode, UnknownMode};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Upload(PathBuf),
    Mode(EditMode),
    Presets,
    Preset(usize),
    Background(String),
    Composite(String),
    Reference(PathBuf),
    Unreference(usize),
    Edit(String),
    Refine(String),
    Regenerate,
    RegenerateLast,
    Variation(usize),
    Undo,
    Redo,
    Retry,
    Dismiss,
    Status { json: bool },
    Save(Option<PathBuf>),
    Help,
    Quit,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ParseError {
    #[error("unknown command '{0}' (type `help`)")]
    Unknown(String),

    #[error("`{command}` needs {argument}")]
    MissingArgument {
        command: &'static str,
        argument: &'static str,
    },

    #[error("'{0}' is not a number starting at 1")]
    InvalidIndex(String),

    #[error(transparent)]
    Mode(#[from] UnknownMode),
}

pub const HELP: &str = "\
commands:
  upload PATH         load a new base image (starts a fresh session)
  mode NAME           avatar | professional | product | combine
  presets             list presets for the current mode
  preset N            edit the original with preset N
  background DESC     replace the background (professional)
  composite [TEXT]    combine product and reference (product)
  ref PATH            attach a reference image
  unref N             remove reference N
  edit PROMPT         edit the original image
  refine PROMPT       edit the image on screen as a new step
  regen               new variation of the current step
  regen-last          new variation derived from the previous step
  variation N         show variation N of the current step
  undo | redo         move between steps
  retry               replay the last failed request
  dismiss             clear the error message
  status [json]       show the session
  save [PATH]         write the image on screen to disk
  help | quit";

impl Command {
    pub fn parse(line: &str) -> Result<Option<Self>, ParseError> {
        let line = line.trim();
        if line.is_empty() {
            return Ok(None);
        }
        let (name, rest) = match line.split_once(char::is_whitespace) {
            Some((name, rest)) => (name, rest.trim()),
            None => (line, ""),
        };

        let command = match name.to_ascii_lowercase().as_str() {
            "upload" | "open" => Command::Upload(path(rest, "upload")?),
            "mode" => Command::Mode(required(rest, "mode", "a mode name")?.parse()?),
            "presets" => Command::Presets,
            "preset" => Command::Preset(index(required(rest, "preset", "a preset number")?)?),
            "background" | "bg" => {
                Command::Background(required(rest, "background", "a description")?.to_string())
            }
            "composite" => Command::Composite(rest.to_string()),
            "ref" => Command::Reference(path(rest, "ref")?),
            "unref" => Command::Unreference(index(required(rest, "unref", "a reference number")?)?),
            "edit" => Command::Edit(rest.to_string()),
            "refine" => Command::Refine(rest.to_string()),
            "regen" => Command::Regenerate,
            "regen-last" => Command::RegenerateLast,
            "variation" | "v" => {
                Command::Variation(index(required(rest, "variation", "a variation number")?)?)
            }
            "undo" => Command::Undo,
            "redo" => Command::Redo,
            "retry" => Command::Retry,
            "dismiss" => Command::Dismiss,
            "status" => Command::Status {
                json: rest.eq_ignore_ascii_case("json"),
            },
            "save" => Command::Save((!rest.is_empty()).then(|| PathBuf::from(rest))),
            "help" | "?" => Command::Help,
            "quit" | "exit" | "q" => Command::Quit,
            other => return Err(ParseError::Unknown(other.to_string())),
        };
        Ok(Some(command))
    }
}

fn required<'a>(
    rest: &'a str,
    command: &'static str,
    argument: &'static str,
) -> Result<&'a str, ParseError> {
    if rest.is_empty() {
        Err(ParseError::MissingArgument { command, argument })
    } else {
        Ok(rest)
    }
}

fn path(rest: &str, command: &'static str) -> Result<PathBuf, ParseError> {
    Ok(PathBuf::from(required(rest, command, "a file path")?))
}

fn index(raw: &str) -> Result<usize, ParseError> {
    match raw.parse::<usize>() {
        Ok(n) if n > 0 => Ok(n - 1),
        _ => Err(ParseError::InvalidIndex(raw.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use retouch_core::EditMode;

    use super::{Command, ParseError};

    fn parse(line: &str) -> Command {
        Command::parse(line)
            .expect("parse")
            .expect("command")
    }

    #[test]
    fn prompts_keep_their_spacing() {
        assert_eq!(
            parse("edit   add a red  hat "),
            Command::Edit("add a red  hat".to_string())
        );
        // Empty prompts are left for the studio to reject.
        assert_eq!(parse("refine"), Command::Refine(String::new()));
    }

    #[test]
    fn indices_are_one_based() {
        assert_eq!(parse("variation 2"), Command::Variation(1));
        assert_eq!(parse("unref 1"), Command::Unreference(0));
        assert_eq!(
            Command::parse("variation 0"),
            Err(ParseError::InvalidIndex("0".to_string()))
        );
    }

    #[test]
    fn arguments_are_checked() {
        assert_eq!(parse("mode Product"), Command::Mode(EditMode::Product));
        assert_eq!(
            parse("upload photos/me.png"),
            Command::Upload(PathBuf::from("photos/me.png"))
        );
        assert_eq!(parse("save"), Command::Save(None));
        assert_eq!(parse("status json"), Command::Status { json: true });
        assert!(matches!(
            Command::parse("ref"),
            Err(ParseError::MissingArgument { command: "ref", .. })
        ));
        assert!(matches!(Command::parse("mode sketch"), Err(ParseError::Mode(_))));
        assert_eq!(
            Command::parse("frobnicate"),
            Err(ParseError::Unknown("frobnicate".to_string()))
        );
    }

    #[test]
    fn blank_lines_are_ignored() {
        assert_eq!(Command::parse("   "), Ok(None));
    }
}
