//! Command-line argument parsing.

use calcbook_core::ParamSet;
use serde_json::Value;
use std::path::PathBuf;

use crate::error::{CliError, Result};

#[derive(Debug, Default, PartialEq)]
pub(crate) struct Args {
    pub book: Option<PathBuf>,
    pub calculation: Option<String>,
    pub params: ParamSet,
    pub functions_files: Vec<PathBuf>,
    pub no_default_functions: bool,
    pub no_cache: bool,
    pub detailed: bool,
    pub list: bool,
    pub dependents: bool,
    pub verbose: bool,
    pub help: bool,
}

pub(crate) fn print_usage() {
    eprintln!("Usage: calcbook [OPTIONS] <BOOK> [CALCULATION]");
    eprintln!();
    eprintln!("Arguments:");
    eprintln!("  <BOOK>                    Calculation book to load (.toml)");
    eprintln!("  [CALCULATION]             Id of the calculation to execute");
    eprintln!();
    eprintln!("Options:");
    eprintln!("  -p, --param <NAME=VALUE>  Supply a parameter value (can be repeated)");
    eprintln!("  -f, --functions <FILE>    Load Rhai helper functions (can be repeated)");
    eprintln!("  --no-default-functions    Skip the per-user default.rhai");
    eprintln!("  --no-cache                Re-execute referenced calculations");
    eprintln!("  -d, --detailed            Print result, parameters and log as JSON");
    eprintln!("  -l, --list                List the book's calculations");
    eprintln!("  --dependents              List calculations that reference CALCULATION");
    eprintln!("  -v, --verbose             Debug logging on stderr");
    eprintln!("  -h, --help                Print help");
}

/// `NAME=VALUE`; the value is read as JSON when it parses, text otherwise.
pub(crate) fn parse_param(arg: &str) -> Result<(String, Value)> {
    let Some((name, value)) = arg.split_once('=') else {
        return Err(CliError::InvalidParam(arg.to_string()));
    };
    let name = name.trim();
    if name.is_empty() {
        return Err(CliError::InvalidParam(arg.to_string()));
    }
    let value = serde_json::from_str(value).unwrap_or_else(|_| Value::String(value.to_string()));
    Ok((name.to_string(), value))
}

pub(crate) fn parse_args(args: &[String]) -> Result<Args> {
    let mut parsed = Args::default();

    let mut i = 0;
    while i < args.len() {
        match args[i].as_str() {
            "-h" | "--help" => parsed.help = true,
            "-p" | "--param" => {
                i += 1;
                let arg = args.get(i).ok_or(CliError::MissingValue("--param"))?;
                let (name, value) = parse_param(arg)?;
                parsed.params.insert(name, value);
            }
            "-f" | "--functions" => {
                i += 1;
                let arg = args.get(i).ok_or(CliError::MissingValue("--functions"))?;
                parsed.functions_files.push(PathBuf::from(arg));
            }
            "--no-default-functions" => parsed.no_default_functions = true,
            "--no-cache" => parsed.no_cache = true,
            "-d" | "--detailed" => parsed.detailed = true,
            "-l" | "--list" => parsed.list = true,
            "--dependents" => parsed.dependents = true,
            "-v" | "--verbose" => parsed.verbose = true,
            arg if arg.starts_with('-') => return Err(CliError::UnknownOption(arg.to_string())),
            arg => {
                if parsed.book.is_none() {
                    parsed.book = Some(PathBuf::from(arg));
                } else if parsed.calculation.is_none() {
                    parsed.calculation = Some(arg.to_string());
                } else {
                    return Err(CliError::UnexpectedArgument(arg.to_string()));
                }
            }
        }
        i += 1;
    }

    if parsed.book.is_none() && !parsed.help {
        return Err(CliError::MissingBook);
    }
    Ok(parsed)
}
