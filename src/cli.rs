/*
 * This file is part of Thermolog.
 *
 * Copyright (C) 2025 Thermolog contributors
 *
 * Thermolog is free software: you can redistribute it and/or modify
 * it under the terms of the GNU General Public License as published by
 * the Free Software Foundation, either version 3 of the License, or
 * (at your option) any later version.
 *
 * Thermolog is distributed in the hope that it will be useful,
 * but WITHOUT ANY WARRANTY; without even the implied warranty of
 * MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE. See the
 * GNU General Public License for more details.
 *
 * You should have received a copy of the GNU General Public License
 * along with Thermolog. If not, see <https://www.gnu.org/licenses/>.
 */

//! Command line handling for thermologd
//!
//! Deliberately small: a config path, help and version.

use std::path::PathBuf;

use anyhow::{bail, Result};

pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Run the collector
    Run { config: Option<PathBuf> },
    Help,
    Version,
}

/// Parse arguments, without the program name
pub fn parse_args<I>(args: I) -> Result<Command>
where
    I: IntoIterator<Item = String>,
{
    let mut config = None;
    let mut args = args.into_iter();

    while let Some(arg) = args.next() {
        match arg.as_str() {
            "-h" | "--help" => return Ok(Command::Help),
            "-v" | "--version" => return Ok(Command::Version),
            "-c" | "--config" => match args.next() {
                Some(path) => config = Some(PathBuf::from(path)),
                None => bail!("--config requires a path argument"),
            },
            other => {
                if let Some(path) = other.strip_prefix("--config=") {
                    config = Some(PathBuf::from(path));
                } else {
                    bail!("Unknown argument: {}", other);
                }
            }
        }
    }

    Ok(Command::Run { config })
}

pub fn print_help() {
    eprintln!("thermologd {}", VERSION);
    eprintln!("1-Wire temperature sampling and aggregation daemon");
    eprintln!();
    eprintln!("USAGE:");
    eprintln!("    thermologd [OPTIONS]");
    eprintln!();
    eprintln!("OPTIONS:");
    eprintln!("    -c, --config <PATH>  Configuration file");
    eprintln!("    -v, --version        Print version");
    eprintln!("    -h, --help           Print this help");
    eprintln!();
    eprintln!("ENVIRONMENT:");
    eprintln!("    THERMOLOG_CONFIG     Configuration file when --config is not given");
    eprintln!("    THERMOLOG_LOG        Log filter (default: info)");
}

pub fn print_version() {
    println!("thermologd {}", VERSION);
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Result<Command> {
        parse_args(args.iter().map(|s| s.to_string()))
    }

    #[test]
    fn test_no_args_runs_with_defaults() {
        assert_eq!(parse(&[]).unwrap(), Command::Run { config: None });
    }

    #[test]
    fn test_config_forms() {
        let expected = Command::Run { config: Some(PathBuf::from("/tmp/t.json")) };
        assert_eq!(parse(&["-c", "/tmp/t.json"]).unwrap(), expected);
        assert_eq!(parse(&["--config", "/tmp/t.json"]).unwrap(), expected);
        assert_eq!(parse(&["--config=/tmp/t.json"]).unwrap(), expected);
    }

    #[test]
    fn test_help_and_version_short_circuit() {
        assert_eq!(parse(&["--help", "--bogus"]).unwrap(), Command::Help);
        assert_eq!(parse(&["-v"]).unwrap(), Command::Version);
    }

    #[test]
    fn test_errors() {
        assert!(parse(&["--config"]).is_err());
        assert!(parse(&["--foreground"]).is_err());
    }
}
