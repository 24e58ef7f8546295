//! Metadata file lexing/validation and the memory descriptor codec.

use std::fs;
use std::path::Path;

use once_cell::sync::Lazy;
use regex::Regex;

use crate::error::MetadataError;

const START_LINE: &str = "Start Program Meta-Data Code:";
const END_LINE: &str = "End Program Meta-Data Code.";

/// One metadata command letter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Sentinel,
    Application,
    Processing,
    Input,
    Output,
    Memory,
}

impl Command {
    pub(crate) fn from_letter(letter: char) -> Option<Self> {
        match letter {
            'S' => Some(Command::Sentinel),
            'A' => Some(Command::Application),
            'P' => Some(Command::Processing),
            'I' => Some(Command::Input),
            'O' => Some(Command::Output),
            'M' => Some(Command::Memory),
            _ => None,
        }
    }

    fn letter(self) -> char {
        match self {
            Command::Sentinel => 'S',
            Command::Application => 'A',
            Command::Processing => 'P',
            Command::Input => 'I',
            Command::Output => 'O',
            Command::Memory => 'M',
        }
    }

    /// The bounded set of opStrings valid for this command, recovered from
    /// the original metadata lexer's lookup table.
    fn allowed_op_strings(self) -> &'static [&'static str] {
        match self {
            Command::Sentinel | Command::Application => &["start", "end"],
            Command::Processing => &["run"],
            Command::Memory => &["access", "allocate"],
            Command::Input => &["hard drive", "keyboard"],
            Command::Output => &["hard drive", "printer", "monitor"],
        }
    }
}

/// One parsed `C(opString)N` metadata item.
#[derive(Debug, Clone)]
pub struct Operation {
    pub command: Command,
    pub op_string: String,
    pub cycle_time: u32,
}

static ITEM_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^([SAPIOM])\(([^)]*)\)(\d+)$").unwrap());

fn parse_item(raw: &str) -> Result<Operation, MetadataError> {
    let caps = ITEM_PATTERN
        .captures(raw)
        .ok_or_else(|| MetadataError::BadComponent(raw.to_string()))?;
    let bad = || MetadataError::BadComponent(raw.to_string());
    let letter = caps
        .get(1)
        .and_then(|m| m.as_str().chars().next())
        .ok_or_else(bad)?;
    let op_string = caps.get(2).ok_or_else(bad)?.as_str().to_string();
    let cycle_raw = caps.get(3).ok_or_else(bad)?.as_str();

    let command = Command::from_letter(letter)
        .ok_or_else(|| MetadataError::UnknownCommand(letter, raw.to_string()))?;

    if !command.allowed_op_strings().contains(&op_string.as_str()) {
        return Err(MetadataError::InvalidOpString {
            command: letter,
            op_string,
        });
    }

    let cycle_time: u32 = cycle_raw
        .parse()
        .map_err(|_| MetadataError::BadCycleTime(cycle_raw.to_string()))?;

    Ok(Operation {
        command,
        op_string,
        cycle_time,
    })
}

/// Lexes and validates a full metadata file into the flat stream of
/// [`Operation`] items between its sentinels. PCB assembly (splitting on
/// `A(start)`/`A(end)` boundaries) happens separately in `pcb::build_pcbs`.
pub fn parse_metadata(path: &Path) -> Result<Vec<Operation>, MetadataError> {
    let contents = fs::read_to_string(path).map_err(|source| MetadataError::Open {
        path: path.to_path_buf(),
        source,
    })?;

    let body = contents
        .trim_start()
        .strip_prefix(START_LINE)
        .ok_or(MetadataError::BadStartLine)?;

    let end_pos = body.rfind(END_LINE).ok_or(MetadataError::BadEndLine)?;
    let items_text = &body[..end_pos];

    let mut operations = Vec::new();
    for raw_item in items_text.split(|c| c == ';' || c == '.') {
        let trimmed = raw_item.trim();
        if trimmed.is_empty() {
            continue;
        }
        operations.push(parse_item(trimmed)?);
    }

    if operations.is_empty() {
        return Err(MetadataError::BadComponent(String::new()));
    }

    Ok(operations)
}

/// Decodes a memory descriptor's digit-packed `cycleTime` into
/// `(segment, start, offset)`.
pub fn decode_memory(cycle_time: u32) -> (u32, u32, u32) {
    let segment = cycle_time / 1_000_000;
    let start = (cycle_time / 1_000) % 1_000;
    let offset = cycle_time % 1_000;
    (segment, start, offset)
}

/// Encodes `(segment, start, offset)` back into the packed `cycleTime`
/// representation.
pub fn encode_memory(segment: u32, start: u32, offset: u32) -> u32 {
    segment * 1_000_000 + start * 1_000 + offset
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_temp(contents: &str) -> tempfile::NamedTempFile {
        let mut f = tempfile::NamedTempFile::new().unwrap();
        f.write_all(contents.as_bytes()).unwrap();
        f
    }

    #[test]
    fn parses_simple_stream() {
        let text = "Start Program Meta-Data Code:\n\
                     S(start)0;A(start)0;P(run)3;A(end)0;S(end)0.\n\
                     End Program Meta-Data Code.\n";
        let file = write_temp(text);
        let ops = parse_metadata(file.path()).unwrap();
        assert_eq!(ops.len(), 5);
        assert_eq!(ops[2].command, Command::Processing);
        assert_eq!(ops[2].cycle_time, 3);
    }

    #[test]
    fn rejects_invalid_op_string_for_command() {
        let text = "Start Program Meta-Data Code:\n\
                     S(start)0;P(sleep)3;S(end)0.\n\
                     End Program Meta-Data Code.\n";
        let file = write_temp(text);
        let err = parse_metadata(file.path()).unwrap_err();
        assert!(matches!(err, MetadataError::InvalidOpString { .. }));
    }

    #[test]
    fn rejects_missing_start_sentinel() {
        let text = "S(start)0;S(end)0.\nEnd Program Meta-Data Code.\n";
        let file = write_temp(text);
        let err = parse_metadata(file.path()).unwrap_err();
        assert!(matches!(err, MetadataError::BadStartLine));
    }

    #[test]
    fn memory_descriptor_round_trips() {
        let encoded = encode_memory(1, 50, 100);
        assert_eq!(decode_memory(encoded), (1, 50, 100));
        assert_eq!(encoded, 1_050_100);
    }

    #[test]
    fn command_letter_round_trips() {
        for c in [
            Command::Sentinel,
            Command::Application,
            Command::Processing,
            Command::Input,
            Command::Output,
            Command::Memory,
        ] {
            assert_eq!(Command::from_letter(c.letter()), Some(c));
        }
    }
}
