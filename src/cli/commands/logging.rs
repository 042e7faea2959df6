//! Verbosity argument shared by every invocation.

use clap::{builder::ValueParser, Arg, ArgAction, Command};

pub const ARG_VERBOSITY: &str = "verbosity";

pub fn validator_log_level() -> ValueParser {
    ValueParser::from(move |level: &str| -> std::result::Result<u8, String> {
        if let Ok(parsed) = level.parse::<u8>() {
            // Successfully parsed as a number
            if parsed <= 5 {
                return Ok(parsed);
            }
        }

        match level.to_lowercase().as_str() {
            "error" => Ok(0),
            "warn" => Ok(1),
            "info" => Ok(2),
            "debug" => Ok(3),
            "trace" => Ok(4),
            _ => Err("invalid log level".to_string()),
        }
    })
}

pub fn with_args(command: Command) -> Command {
    command.arg(
        Arg::new(ARG_VERBOSITY)
            .short('v')
            .long("verbose")
            .help("Verbosity level: ERROR, WARN, INFO, DEBUG, TRACE (default: ERROR)")
            .env("PORDISTO_LOG_LEVEL")
            .global(true)
            .action(ArgAction::Count)
            .value_parser(validator_log_level()),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn command() -> Command {
        with_args(Command::new("test"))
    }

    #[test]
    fn test_log_level_names() {
        let levels = vec!["error", "warn", "info", "debug", "trace"];

        for (index, &level) in levels.iter().enumerate() {
            temp_env::with_vars([("PORDISTO_LOG_LEVEL", Some(level))], || {
                let matches = command().get_matches_from(vec!["test"]);

                assert_eq!(
                    matches.get_one::<u8>(ARG_VERBOSITY).map(|v| *v),
                    Some(index as u8)
                );
            });
        }
    }

    #[test]
    fn test_log_level_flags() {
        for count in 0..4_usize {
            temp_env::with_vars([("PORDISTO_LOG_LEVEL", None::<String>)], || {
                let mut args = vec!["test".to_string()];

                if count > 0 {
                    args.push(format!("-{}", "v".repeat(count)));
                }

                let matches = command().get_matches_from(args);

                assert_eq!(
                    matches.get_one::<u8>(ARG_VERBOSITY).map(|v| *v),
                    Some(count as u8)
                );
            });
        }
    }

    #[test]
    fn test_log_level_rejects_unknown() {
        temp_env::with_vars([("PORDISTO_LOG_LEVEL", Some("verbosest"))], || {
            let result = command().try_get_matches_from(vec!["test"]);

            assert!(result.is_err());
        });
    }
}
