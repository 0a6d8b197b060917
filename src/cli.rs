//! Command line handling
//!
//! Everything before the first `--` belongs to the wrapper, everything after
//! it is the child command, passed through untouched.

use std::ffi::OsString;
use std::path::PathBuf;

use clap::Parser;
use clap::error::ErrorKind;

use crate::config::LogLevel;
use crate::error::WrapperError;
use crate::process::Command;

/// Token separating wrapper options from the child command
pub const SEPARATOR: &str = "--";

/// Wrapper options
#[derive(Parser, Debug, Clone, PartialEq)]
#[command(
    name = "promwrap",
    version,
    about = "Run a command, relay its output and count matching lines as Prometheus metrics",
    override_usage = "promwrap [OPTIONS] -- <COMMAND> [ARGS]..."
)]
pub struct Args {
    /// Path to the configuration file
    #[arg(short, long, default_value = "config.yaml")]
    pub config: PathBuf,

    /// Address the metrics endpoint listens on; ":PORT" means all interfaces
    #[arg(short, long, default_value = ":2112")]
    pub addr: String,

    /// Log level for the wrapper's own messages
    #[arg(short, long, value_enum, default_value_t = LogLevel::Warn)]
    pub log_level: LogLevel,
}

/// A fully parsed command line
#[derive(Debug, Clone, PartialEq)]
pub struct Invocation {
    pub args: Args,
    pub command: Command,
}

impl Invocation {
    /// Parse a full argv, program name first
    ///
    /// `--help` and `--version` come back as [`WrapperError::Help`] for the
    /// caller to print. Every other problem is reported as
    /// [`WrapperError::Argument`].
    pub fn parse_from<I, S>(argv: I) -> Result<Self, WrapperError>
    where
        I: IntoIterator<Item = S>,
        S: Into<OsString>,
    {
        let argv = argv
            .into_iter()
            .map(|arg| {
                let arg: OsString = arg.into();
                arg.into_string().map_err(|arg| {
                    WrapperError::Argument(format!("Argument is not valid UTF-8: {:?}", arg))
                })
            })
            .collect::<Result<Vec<_>, _>>()?;

        let separator = argv.iter().position(|arg| arg == SEPARATOR);
        let wrapper_argv = match separator {
            Some(index) => &argv[..index],
            None => &argv[..],
        };

        let args = match Args::try_parse_from(wrapper_argv) {
            Ok(args) => args,
            Err(e) if matches!(e.kind(), ErrorKind::DisplayHelp | ErrorKind::DisplayVersion) => {
                return Err(WrapperError::Help(e));
            }
            Err(e) => return Err(WrapperError::Argument(e.render().to_string().trim_end().to_string())),
        };

        let index = separator
            .ok_or_else(|| WrapperError::Argument(format!("No '{}' present in arguments", SEPARATOR)))?;
        let command = Command::from_argv(argv[index + 1..].iter().cloned())?;

        Ok(Self { args, command })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let invocation = Invocation::parse_from(["promwrap", "--", "echo", "hi"]).unwrap();
        assert_eq!(invocation.args.config, PathBuf::from("config.yaml"));
        assert_eq!(invocation.args.addr, ":2112");
        assert_eq!(invocation.args.log_level, LogLevel::Warn);
        assert_eq!(invocation.command, Command::new("echo").arg("hi"));
    }

    #[test]
    fn test_wrapper_options() {
        let invocation = Invocation::parse_from([
            "promwrap", "-c", "/etc/promwrap.toml", "--addr", "127.0.0.1:9000", "-l", "debug", "--", "server",
        ])
        .unwrap();
        assert_eq!(invocation.args.config, PathBuf::from("/etc/promwrap.toml"));
        assert_eq!(invocation.args.addr, "127.0.0.1:9000");
        assert_eq!(invocation.args.log_level, LogLevel::Debug);
        assert_eq!(invocation.command.program(), "server");
    }

    #[test]
    fn test_child_arguments_are_verbatim() {
        let invocation =
            Invocation::parse_from(["promwrap", "--", "grep", "--config", "-c", "--", "x"]).unwrap();
        assert_eq!(invocation.command.program(), "grep");
        assert_eq!(invocation.command.get_args(), ["--config", "-c", "--", "x"]);
    }

    #[test]
    fn test_missing_separator() {
        let err = Invocation::parse_from(["promwrap", "echo", "hi"]).unwrap_err();
        assert!(matches!(err, WrapperError::Argument(_)));

        let err = Invocation::parse_from(["promwrap"]).unwrap_err();
        assert!(err.to_string().contains("No '--' present"));
    }

    #[test]
    fn test_missing_child_command() {
        let err = Invocation::parse_from(["promwrap", "-c", "x.yaml", "--"]).unwrap_err();
        assert!(matches!(err, WrapperError::Argument(_)));
        assert!(err.to_string().contains("No child command"));
    }

    #[test]
    fn test_unknown_wrapper_option() {
        let err = Invocation::parse_from(["promwrap", "--bogus", "--", "true"]).unwrap_err();
        assert!(matches!(err, WrapperError::Argument(_)));
    }

    #[test]
    fn test_invalid_log_level() {
        let err = Invocation::parse_from(["promwrap", "-l", "loud", "--", "true"]).unwrap_err();
        assert_eq!(err.exit_code(), 2);
    }

    #[test]
    fn test_help_and_version_are_returned_to_the_caller() {
        for flag in ["--help", "-V"] {
            let err = Invocation::parse_from(["promwrap", flag]).unwrap_err();
            assert!(matches!(err, WrapperError::Help(_)));
            assert_eq!(err.exit_code(), 0);
        }

        let err = Invocation::parse_from(["promwrap", "--help", "--", "true"]).unwrap_err();
        assert!(err.to_string().contains("promwrap [OPTIONS] -- <COMMAND>"));
    }
}
