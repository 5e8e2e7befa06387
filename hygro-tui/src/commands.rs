//! Command palette parsing.
//!
//! Sensor indices are 1-based, matching the numbers shown in the sensor
//! table.

use hygro_core::{SensorAddr, ValidationError};
use std::path::PathBuf;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Host(String),
    Database(String),
    /// An empty prefix removes the extra tags.
    Prefix(String),
    Interval(u16),
    Add { addr: SensorAddr, name: String },
    /// Zero-based index.
    Rename { index: usize, name: String },
    /// Zero-based index.
    Remove(usize),
    Save,
    Reload,
    Export(PathBuf),
    Import(PathBuf),
    Delete(String),
    Clear,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CommandError {
    #[error("Empty command")]
    Empty,
    #[error("Unknown command: {0}")]
    Unknown(String),
    #[error("Usage: {usage}")]
    MissingArgument { usage: &'static str },
    #[error("Invalid {what}: {value}")]
    InvalidArgument { what: &'static str, value: String },
    #[error(transparent)]
    Validation(#[from] ValidationError),
}

/// Short reference shown in the help overlay.
pub const COMMAND_HELP: &[(&str, &str)] = &[
    ("host <ip>", "InfluxDB host"),
    ("db <name>", "measurement name"),
    ("prefix [tags]", "extra tags, empty to remove"),
    ("interval <s>", "reporting interval"),
    ("add <addr> <name>", "add a sensor"),
    ("rename <n> <name>", "rename sensor n"),
    ("rm <n>", "remove sensor n"),
    ("save / reload", "store or fetch the configuration"),
    ("export <file>", "download the configuration"),
    ("import <file>", "upload a configuration file"),
    ("delete <url>", "DELETE a resource on the device"),
    ("clear", "clear the status line"),
];

pub fn parse(input: &str) -> Result<Command, CommandError> {
    let input = input.trim();
    let (verb, rest) = match input.split_once(char::is_whitespace) {
        Some((verb, rest)) => (verb, rest.trim()),
        None => (input, ""),
    };

    match verb {
        "" => Err(CommandError::Empty),
        "host" => Ok(Command::Host(required(rest, "host <ip>")?.to_string())),
        "db" => Ok(Command::Database(required(rest, "db <name>")?.to_string())),
        "prefix" => Ok(Command::Prefix(rest.to_string())),
        "interval" => {
            let value = required(rest, "interval <seconds>")?;
            value
                .parse::<u16>()
                .map(Command::Interval)
                .map_err(|_| CommandError::InvalidArgument {
                    what: "interval",
                    value: value.to_string(),
                })
        }
        "add" => {
            let (addr, name) = split_pair(rest, "add <addr> <name>")?;
            Ok(Command::Add {
                addr: addr.parse()?,
                name: name.to_string(),
            })
        }
        "rename" => {
            let (index, name) = split_pair(rest, "rename <n> <name>")?;
            Ok(Command::Rename {
                index: parse_index(index)?,
                name: name.to_string(),
            })
        }
        "rm" | "remove" => Ok(Command::Remove(parse_index(required(rest, "rm <n>")?)?)),
        "save" => Ok(Command::Save),
        "reload" => Ok(Command::Reload),
        "export" => Ok(Command::Export(PathBuf::from(required(rest, "export <file>")?))),
        "import" => Ok(Command::Import(PathBuf::from(required(rest, "import <file>")?))),
        "delete" => Ok(Command::Delete(required(rest, "delete <url>")?.to_string())),
        "clear" => Ok(Command::Clear),
        other => Err(CommandError::Unknown(other.to_string())),
    }
}

fn required<'a>(rest: &'a str, usage: &'static str) -> Result<&'a str, CommandError> {
    if rest.is_empty() {
        Err(CommandError::MissingArgument { usage })
    } else {
        Ok(rest)
    }
}

fn split_pair<'a>(rest: &'a str, usage: &'static str) -> Result<(&'a str, &'a str), CommandError> {
    match rest.split_once(char::is_whitespace) {
        Some((first, second)) if !second.trim().is_empty() => Ok((first, second.trim())),
        _ => Err(CommandError::MissingArgument { usage }),
    }
}

fn parse_index(value: &str) -> Result<usize, CommandError> {
    match value.parse::<usize>() {
        Ok(n) if n >= 1 => Ok(n - 1),
        _ => Err(CommandError::InvalidArgument {
            what: "sensor number",
            value: value.to_string(),
        }),
    }
}
