//! Token, rate-limit, CORS and storage arguments.

use clap::{Arg, ArgAction, Command};

pub const ARG_TOKEN_SECRET: &str = "token-secret";
pub const ARG_TOKEN_TTL: &str = "token-ttl";
pub const ARG_RATE_LIMIT_WINDOW: &str = "rate-limit-window";
pub const ARG_RATE_LIMIT_MAX: &str = "rate-limit-max";
pub const ARG_CORS_ORIGIN: &str = "cors-origin";
pub const ARG_STORAGE_ROOT: &str = "storage-root";
pub const ARG_DIAGNOSTICS: &str = "diagnostics";

pub fn with_args(command: Command) -> Command {
    command
        .arg(
            Arg::new(ARG_TOKEN_SECRET)
                .long(ARG_TOKEN_SECRET)
                .help("Secret used to sign and verify bearer tokens")
                .env("PORDISTO_TOKEN_SECRET")
                .required(true),
        )
        .arg(
            Arg::new(ARG_TOKEN_TTL)
                .long(ARG_TOKEN_TTL)
                .help("Token lifetime in seconds")
                .env("PORDISTO_TOKEN_TTL")
                .default_value("900")
                .value_parser(clap::value_parser!(u64).range(1..)),
        )
        .arg(
            Arg::new(ARG_RATE_LIMIT_WINDOW)
                .long(ARG_RATE_LIMIT_WINDOW)
                .help("Rate limit window in seconds for the credential endpoints")
                .env("PORDISTO_RATE_LIMIT_WINDOW")
                .default_value("900")
                .value_parser(clap::value_parser!(u64).range(1..)),
        )
        .arg(
            Arg::new(ARG_RATE_LIMIT_MAX)
                .long(ARG_RATE_LIMIT_MAX)
                .help("Requests allowed per window and client")
                .env("PORDISTO_RATE_LIMIT_MAX")
                .default_value("25")
                .value_parser(clap::value_parser!(u32).range(1..)),
        )
        .arg(
            Arg::new(ARG_CORS_ORIGIN)
                .long(ARG_CORS_ORIGIN)
                .help("Comma-separated list of allowed CORS origins, empty disables CORS")
                .env("PORDISTO_CORS_ORIGIN")
                .default_value(""),
        )
        .arg(
            Arg::new(ARG_STORAGE_ROOT)
                .long(ARG_STORAGE_ROOT)
                .help("Directory served by the files endpoint")
                .env("PORDISTO_STORAGE_ROOT")
                .default_value("uploads"),
        )
        .arg(
            Arg::new(ARG_DIAGNOSTICS)
                .long(ARG_DIAGNOSTICS)
                .help("Include error detail in 500 responses")
                .env("PORDISTO_DIAGNOSTICS")
                .action(ArgAction::SetTrue),
        )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn command() -> Command {
        with_args(Command::new("test"))
    }

    #[test]
    fn test_defaults() {
        temp_env::with_vars(
            [
                ("PORDISTO_TOKEN_TTL", None::<String>),
                ("PORDISTO_RATE_LIMIT_WINDOW", None),
                ("PORDISTO_RATE_LIMIT_MAX", None),
                ("PORDISTO_CORS_ORIGIN", None),
                ("PORDISTO_STORAGE_ROOT", None),
                ("PORDISTO_DIAGNOSTICS", None),
            ],
            || {
                let matches =
                    command().get_matches_from(vec!["test", "--token-secret", "hunter2hunter2"]);

                assert_eq!(matches.get_one::<u64>(ARG_TOKEN_TTL).copied(), Some(900));
                assert_eq!(
                    matches.get_one::<u64>(ARG_RATE_LIMIT_WINDOW).copied(),
                    Some(900)
                );
                assert_eq!(
                    matches.get_one::<u32>(ARG_RATE_LIMIT_MAX).copied(),
                    Some(25)
                );
                assert_eq!(
                    matches.get_one::<String>(ARG_CORS_ORIGIN).map(String::as_str),
                    Some("")
                );
                assert_eq!(
                    matches
                        .get_one::<String>(ARG_STORAGE_ROOT)
                        .map(String::as_str),
                    Some("uploads")
                );
                assert!(!matches.get_flag(ARG_DIAGNOSTICS));
            },
        );
    }

    #[test]
    fn test_token_secret_is_required() {
        temp_env::with_vars([("PORDISTO_TOKEN_SECRET", None::<String>)], || {
            let result = command().try_get_matches_from(vec!["test"]);

            assert!(result.is_err());
        });
    }

    #[test]
    fn test_env_overrides() {
        temp_env::with_vars(
            [
                ("PORDISTO_TOKEN_SECRET", Some("hunter2hunter2")),
                ("PORDISTO_TOKEN_TTL", Some("60")),
                ("PORDISTO_RATE_LIMIT_WINDOW", Some("30")),
                ("PORDISTO_RATE_LIMIT_MAX", Some("3")),
                (
                    "PORDISTO_CORS_ORIGIN",
                    Some("http://localhost:3001,https://app.example.com"),
                ),
                ("PORDISTO_STORAGE_ROOT", Some("/srv/files")),
            ],
            || {
                let matches = command().get_matches_from(vec!["test"]);

                assert_eq!(
                    matches
                        .get_one::<String>(ARG_TOKEN_SECRET)
                        .map(String::as_str),
                    Some("hunter2hunter2")
                );
                assert_eq!(matches.get_one::<u64>(ARG_TOKEN_TTL).copied(), Some(60));
                assert_eq!(
                    matches.get_one::<u64>(ARG_RATE_LIMIT_WINDOW).copied(),
                    Some(30)
                );
                assert_eq!(
                    matches.get_one::<u32>(ARG_RATE_LIMIT_MAX).copied(),
                    Some(3)
                );
                assert_eq!(
                    matches.get_one::<String>(ARG_CORS_ORIGIN).map(String::as_str),
                    Some("http://localhost:3001,https://app.example.com")
                );
                assert_eq!(
                    matches
                        .get_one::<String>(ARG_STORAGE_ROOT)
                        .map(String::as_str),
                    Some("/srv/files")
                );
            },
        );
    }

    #[test]
    fn test_rejects_zero_window() {
        let result = command().try_get_matches_from(vec![
            "test",
            "--token-secret",
            "hunter2hunter2",
            "--rate-limit-window",
            "0",
        ]);

        assert!(result.is_err());
    }
}
