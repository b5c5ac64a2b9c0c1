//! Helper functions written as plain Rhai `fn` items in a file.
//!
//! Each top-level `fn name(a, b) { .. }` becomes a global [`FunctionDef`]
//! whose code is the body between the braces.

use calcbook_engine::engine::{FunctionDef, create_engine};
use regex::Regex;
use std::path::Path;
use std::sync::OnceLock;

use crate::error::{CalcError, Result};

const MAX_FUNCTION_FILE_BYTES: u64 = 1_048_576; // 1 MiB

fn fn_header_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?m)^[ \t]*(?:private[ \t]+)?fn[ \t]+([A-Za-z_][A-Za-z0-9_]*)[ \t]*\(([^)]*)\)\s*\{")
            .expect("fn header regex must compile")
    })
}

/// Read a functions file, refusing anything implausibly large.
pub fn read_functions_file(path: &Path) -> Result<String> {
    let meta = std::fs::metadata(path)?;
    if meta.len() > MAX_FUNCTION_FILE_BYTES {
        return Err(CalcError::Io(std::io::Error::new(
            std::io::ErrorKind::InvalidData,
            format!(
                "Refusing to read {}: functions file too large ({} bytes, max {})",
                path.display(),
                meta.len(),
                MAX_FUNCTION_FILE_BYTES
            ),
        )));
    }
    Ok(std::fs::read_to_string(path)?)
}

/// Split Rhai source into function definitions.
///
/// The whole source is compiled first so syntax errors are reported with
/// their real positions.
pub fn parse_function_items(source: &str) -> Result<Vec<FunctionDef>> {
    create_engine()
        .compile(source)
        .map_err(|e| CalcError::parse(format!("Rhai compile error: {}", e)))?;

    let mut defs = Vec::new();
    let mut consumed = 0;
    for caps in fn_header_re().captures_iter(source) {
        let Some(header) = caps.get(0) else { continue };
        if header.start() < consumed {
            continue;
        }

        let body_start = header.end();
        let body_end = closing_brace(source, body_start).ok_or_else(|| {
            CalcError::parse(format!("unterminated body for function {}", &caps[1]))
        })?;
        consumed = body_end + 1;

        let params: Vec<String> = caps[2]
            .split(',')
            .map(str::trim)
            .filter(|p| !p.is_empty())
            .map(String::from)
            .collect();

        defs.push(FunctionDef {
            name: caps[1].to_string(),
            params,
            code: source[body_start..body_end].trim().to_string(),
            description: None,
            global: true,
        });
    }
    Ok(defs)
}

/// Byte offset of the brace closing the block opened just before `start`.
/// Braces inside strings, character literals and comments are ignored.
fn closing_brace(source: &str, start: usize) -> Option<usize> {
    let bytes = source.as_bytes();
    let mut depth = 1usize;
    let mut i = start;

    while i < bytes.len() {
        match bytes[i] {
            b'{' => depth += 1,
            b'}' => {
                depth -= 1;
                if depth == 0 {
                    return Some(i);
                }
            }
            quote @ (b'"' | b'\'' | b'`') => {
                i += 1;
                while i < bytes.len() && bytes[i] != quote {
                    if bytes[i] == b'\\' {
                        i += 1;
                    }
                    i += 1;
                }
            }
            b'/' if bytes.get(i + 1) == Some(&b'/') => {
                while i < bytes.len() && bytes[i] != b'\n' {
                    i += 1;
                }
            }
            b'/' if bytes.get(i + 1) == Some(&b'*') => {
                i += 2;
                while i + 1 < bytes.len() && !(bytes[i] == b'*' && bytes[i + 1] == b'/') {
                    i += 1;
                }
                i += 1;
            }
            _ => {}
        }
        i += 1;
    }
    None
}
