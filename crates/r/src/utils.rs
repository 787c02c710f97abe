use std::io::Read;
use std::path::PathBuf;

use color_eyre::eyre::Result;
use serde::Serialize;

use crate::Output;

/// Reads stdin and returns a string with its content.
pub fn read_from_stdin() -> Result<String, std::io::Error> {
    let mut stdin = Vec::new();
    tracing::event!(tracing::Level::INFO, "Reading from stdin...");
    let mut lock = std::io::stdin().lock();
    lock.read_to_end(&mut stdin)?;
    Ok(String::from_utf8_lossy(&stdin).to_string())
}

/// Replaces a leading `~` with the user's home directory.
pub fn expand_home(path: &str) -> Result<PathBuf> {
    match path.strip_prefix("~/") {
        Some(rest) => Ok(PathBuf::from(std::env::var("HOME")?).join(rest)),
        None => Ok(PathBuf::from(path)),
    }
}

/// Prints `value` as JSON or YAML. Returns false for `Output::Raw`, which each command
/// renders on its own.
pub fn print_structured<T: Serialize>(format: Output, value: &T) -> Result<bool> {
    match format {
        Output::Raw => return Ok(false),
        Output::Json => println!("{}", serde_json::to_string_pretty(value)?),
        Output::Yaml => print!("{}", serde_yaml::to_string(value)?),
    }

    Ok(true)
}
