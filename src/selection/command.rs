//! Input events for a selection session.
//!
//! Each user action the viewer can produce maps to one [`Command`]. Commands
//! also have a one-line text form, which lets a session be replayed from a
//! script:
//!
//! ```text
//! # comments and blank lines are ignored
//! mode select
//! pick 5
//! tolerance 45
//! mode grow
//! pick 5
//! new
//! m
//! ```

use std::fmt;
use std::str::FromStr;

use super::controller::Mode;
use crate::error::{CarveError, Result};
use crate::mesh::{FaceId, GroupId};

/// One input event.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Command {
    /// A face was picked (`pick N`).
    Pick(FaceId),
    /// Switch to a mode (`mode navigate|select|grow`).
    SetMode(Mode),
    /// Advance to the next mode (`m`).
    CycleMode,
    /// Make the next group current (`next`).
    NextGroup,
    /// Create a group and make it current (`new`).
    NewGroup,
    /// Make a specific group current (`group N`).
    SelectGroup(GroupId),
    /// Empty the current group (`clear`).
    ClearGroup,
    /// Set the region-growing angle tolerance in degrees (`tolerance DEG`).
    SetTolerance(f64),
}

fn parse_index(keyword: &str, arg: Option<&str>) -> Result<usize> {
    let arg = arg.ok_or_else(|| CarveError::invalid_command(0, format!("`{}` needs an index", keyword)))?;
    arg.parse()
        .map_err(|_| CarveError::invalid_command(0, format!("`{}`: `{}` is not an index", keyword, arg)))
}

impl FromStr for Command {
    type Err = CarveError;

    fn from_str(s: &str) -> Result<Self> {
        let mut words = s.split_whitespace();
        let keyword = words
            .next()
            .ok_or_else(|| CarveError::invalid_command(0, "empty command"))?
            .to_ascii_lowercase();
        let arg = words.next();

        let command = match keyword.as_str() {
            "pick" => Command::Pick(FaceId::new(parse_index("pick", arg)?)),
            "group" => Command::SelectGroup(GroupId::new(parse_index("group", arg)?)),
            "mode" => {
                let arg = arg.ok_or_else(|| CarveError::invalid_command(0, "`mode` needs a mode name"))?;
                Command::SetMode(arg.parse()?)
            }
            "tolerance" => {
                let arg = arg.ok_or_else(|| CarveError::invalid_command(0, "`tolerance` needs degrees"))?;
                let degrees: f64 = arg.parse().map_err(|_| {
                    CarveError::invalid_command(0, format!("`tolerance`: `{}` is not a number", arg))
                })?;
                if !degrees.is_finite() {
                    return Err(CarveError::invalid_command(0, "tolerance must be finite"));
                }
                Command::SetTolerance(degrees)
            }
            "m" => Command::CycleMode,
            "next" => Command::NextGroup,
            "new" => Command::NewGroup,
            "clear" => Command::ClearGroup,
            other => {
                return Err(CarveError::invalid_command(0, format!("unknown command `{}`", other)));
            }
        };

        if let Some(extra) = words.next() {
            return Err(CarveError::invalid_command(0, format!("unexpected argument `{}`", extra)));
        }
        Ok(command)
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Command::Pick(face) => write!(f, "pick {}", face),
            Command::SetMode(mode) => write!(f, "mode {}", mode),
            Command::CycleMode => write!(f, "m"),
            Command::NextGroup => write!(f, "next"),
            Command::NewGroup => write!(f, "new"),
            Command::SelectGroup(group) => write!(f, "group {}", group),
            Command::ClearGroup => write!(f, "clear"),
            Command::SetTolerance(deg) => write!(f, "tolerance {}", deg),
        }
    }
}

/// Parse a command script, one command per line.
///
/// Blank lines and everything after `#` are ignored. Errors carry the
/// one-based line number.
pub fn parse_script(text: &str) -> Result<Vec<Command>> {
    let mut commands = Vec::new();
    for (i, raw) in text.lines().enumerate() {
        let line = raw.split('#').next().unwrap_or("").trim();
        if line.is_empty() {
            continue;
        }
        let command = line.parse::<Command>().map_err(|e| match e {
            CarveError::InvalidCommand { message, .. } => CarveError::InvalidCommand { line: i + 1, message },
            other => other,
        })?;
        commands.push(command);
    }
    Ok(commands)
}
