use std::fs;
use std::path::{Path, PathBuf};

use failure::Error;

use crate::doc::{Document, EntityData};

#[derive(Fail, Debug)]
pub enum StorageError {
    #[fail(display = "Character document was not found in the data directory")]
    CharacterNotFound,
    #[fail(display = "Animation document was not found in the data directory")]
    AnimationsNotFound,
}

/// Naming convention tying the two documents of a character together: the
/// animations for `X.json` live in `X_anim.json`.
pub fn animation_file_name(character_file: &str) -> String {
    let stem = character_file
        .strip_suffix(".json")
        .unwrap_or(character_file);
    format!("{}_anim.json", stem)
}

/// Strips `//` line comments and `/* */` block comments so hand-edited
/// source files with trailing comments still parse. String literals are left
/// untouched; comment bytes are replaced by spaces (newlines kept) so error
/// positions still line up with the source.
pub fn strip_comments(text: &str) -> String {
    #[derive(PartialEq)]
    enum Mode {
        Code,
        InString,
        Escape,
        LineComment,
        BlockComment,
    }

    let mut mode = Mode::Code;
    let mut out = String::with_capacity(text.len());
    let mut chars = text.chars().peekable();
    while let Some(c) = chars.next() {
        match mode {
            Mode::Code => match c {
                '"' => {
                    mode = Mode::InString;
                    out.push(c);
                }
                '/' => match chars.peek() {
                    Some('/') => {
                        chars.next();
                        mode = Mode::LineComment;
                        out.push_str("  ");
                    }
                    Some('*') => {
                        chars.next();
                        mode = Mode::BlockComment;
                        out.push_str("  ");
                    }
                    _ => out.push(c),
                },
                _ => out.push(c),
            },
            Mode::InString => {
                out.push(c);
                match c {
                    '\\' => mode = Mode::Escape,
                    '"' => mode = Mode::Code,
                    _ => (),
                }
            }
            Mode::Escape => {
                out.push(c);
                mode = Mode::InString;
            }
            Mode::LineComment => {
                if c == '\n' {
                    mode = Mode::Code;
                    out.push('\n');
                } else {
                    out.push(' ');
                }
            }
            Mode::BlockComment => {
                if c == '*' && chars.peek() == Some(&'/') {
                    chars.next();
                    mode = Mode::Code;
                    out.push_str("  ");
                } else if c == '\n' {
                    out.push('\n');
                } else {
                    out.push(' ');
                }
            }
        }
    }
    out
}

pub fn parse_document(text: &str) -> Result<Document, Error> {
    Ok(serde_json::from_str(&strip_comments(text))?)
}

pub fn parse_entity(text: &str) -> Result<EntityData, Error> {
    Ok(serde_json::from_str(&strip_comments(text))?)
}

fn is_numeric_entry(line: &str) -> bool {
    let trimmed = line.trim();
    let trimmed = trimmed.strip_suffix(',').unwrap_or(trimmed);
    !trimmed.is_empty() && trimmed.parse::<f64>().is_ok()
}

/// Joins every run of 4 numeric lines inside a `"hurtbubbles": [` array
/// onto one line, one bubble endpoint per line, so saved documents diff
/// cleanly. Purely cosmetic; the parser accepts both shapes.
fn coalesce_bubble_lines(text: &str) -> String {
    let mut out: Vec<String> = Vec::new();
    let mut lines = text.lines().peekable();
    while let Some(line) = lines.next() {
        out.push(line.to_owned());
        if !line.trim_end().ends_with("\"hurtbubbles\": [") {
            continue;
        }
        let mut entries: Vec<&str> = Vec::new();
        while let Some(next) = lines.peek() {
            if !is_numeric_entry(next) {
                break;
            }
            entries.push(lines.next().unwrap_or(""));
        }
        for chunk in entries.chunks(4) {
            if chunk.len() == 4 {
                let indent: String = chunk[0]
                    .chars()
                    .take_while(|c| c.is_whitespace())
                    .collect();
                let joined = chunk
                    .iter()
                    .enumerate()
                    .map(|(i, entry)| {
                        let trimmed = entry.trim();
                        if i + 1 < chunk.len() {
                            trimmed.strip_suffix(',').unwrap_or(trimmed)
                        } else {
                            trimmed
                        }
                    })
                    .collect::<Vec<&str>>()
                    .join(", ");
                out.push(format!("{}{}", indent, joined));
            } else {
                // Ragged tail (buffer not a multiple of 4): leave as-is.
                for entry in chunk {
                    out.push((*entry).to_owned());
                }
            }
        }
    }
    out.join("\n")
}

/// Serializes a document the way it goes to disk: pretty-printed JSON with
/// the bubble buffer formatting pass applied and a trailing newline.
pub fn format_document(document: &Document) -> Result<String, Error> {
    let pretty = serde_json::to_string_pretty(document)?;
    Ok(coalesce_bubble_lines(&pretty) + "\n")
}

pub fn save_document<T: AsRef<Path>>(path: T, document: &Document) -> Result<(), Error> {
    let formatted = format_document(document)?;
    fs::write(path.as_ref(), formatted)?;
    Ok(())
}

/// Loads a character's entity document and animation document from the data
/// directory, by character file name (`<name>.json`).
pub fn load_character<T: AsRef<Path>>(
    data_dir: T,
    character_file: &str,
) -> Result<(EntityData, Document), Error> {
    let entity_path: PathBuf = data_dir.as_ref().join(character_file);
    if !entity_path.is_file() {
        return Err(StorageError::CharacterNotFound.into());
    }
    let entity = parse_entity(&fs::read_to_string(&entity_path)?)?;

    let anim_path = data_dir.as_ref().join(animation_file_name(character_file));
    if !anim_path.is_file() {
        return Err(StorageError::AnimationsNotFound.into());
    }
    let document = parse_document(&fs::read_to_string(&anim_path)?)?;

    Ok((entity, document))
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"{
  "jab": {
    "iasa": 2, // cancel window
    "keyframes": [
      {
        "duration": 3,
        "hurtbubbles": [
          0,
          10.5,
          6,
          0,
          0,
          -10,
          4,
          0
        ],
        "hitbubbles": [{ "radius": 8, "follow": "head" }]
      },
      { "duration": 4, "hitbubbles": true },
      { "duration": 1 }
    ]
  }
}"#;

    #[test]
    fn test_parse_tolerates_comments() {
        let source = "{\n  // leading comment\n  \"jab\": { \"keyframes\": [] } /* block */\n}\n";
        let document = parse_document(source).unwrap();
        assert!(document.has_animation("jab"));
    }

    #[test]
    fn test_strip_comments_keeps_strings_intact() {
        let source = r#"{ "name": "a//b /* not a comment */" }"#;
        assert_eq!(strip_comments(source), source);
        let source = "{ \"name\": \"quote \\\" // still string\" }";
        assert_eq!(strip_comments(source), source);
    }

    #[test]
    fn test_round_trip_is_structurally_identical() {
        let document = parse_document(SAMPLE).unwrap();
        let formatted = format_document(&document).unwrap();
        let reparsed = parse_document(&formatted).unwrap();
        assert_eq!(reparsed, document);

        // Formatting is stable once applied.
        let formatted_again = format_document(&reparsed).unwrap();
        assert_eq!(formatted_again, formatted);
    }

    #[test]
    fn test_bubble_lines_are_coalesced() {
        let document = parse_document(SAMPLE).unwrap();
        let formatted = format_document(&document).unwrap();
        let line = formatted
            .lines()
            .find(|l| l.trim_start().starts_with("0.0,"))
            .expect("no coalesced bubble line");
        // 4 numbers per line, one bubble endpoint.
        assert_eq!(line.trim(), "0.0, 10.5, 6.0, 0.0,");
    }

    #[test]
    fn test_animation_file_name_convention() {
        assert_eq!(animation_file_name("crab.json"), "crab_anim.json");
        assert_eq!(animation_file_name("crab"), "crab_anim.json");
    }

    #[test]
    fn test_inherited_hitbubbles_survive_round_trip() {
        let document = parse_document(SAMPLE).unwrap();
        let formatted = format_document(&document).unwrap();
        assert!(formatted.contains("\"hitbubbles\": true"));
    }
}
