use clap::{
    builder::{
        styling::{AnsiColor, Effects, Styles},
        ValueParser,
    },
    Arg, ArgAction, ColorChoice, Command,
};

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

pub fn new() -> Command {
    let styles = Styles::styled()
        .header(AnsiColor::Yellow.on_default() | Effects::BOLD)
        .usage(AnsiColor::Green.on_default() | Effects::BOLD)
        .literal(AnsiColor::Blue.on_default() | Effects::BOLD)
        .placeholder(AnsiColor::Green.on_default());

    Command::new("botforge")
        .about("Custom chatbot backend: authentication and credential lifecycle")
        .version(env!("CARGO_PKG_VERSION"))
        .color(ColorChoice::Auto)
        .styles(styles)
        .arg(
            Arg::new("port")
                .short('p')
                .long("port")
                .help("Port to listen on")
                .default_value("8080")
                .env("BOTFORGE_PORT")
                .value_parser(clap::value_parser!(u16)),
        )
        .arg(
            Arg::new("dsn")
                .short('d')
                .long("dsn")
                .help("Database connection string")
                .env("BOTFORGE_DSN")
                .required(true),
        )
        .arg(
            Arg::new("secret-key")
                .long("secret-key")
                .help("Token signing secret, at least 32 bytes")
                .env("BOTFORGE_SECRET_KEY")
                .required(true),
        )
        .arg(
            Arg::new("frontend-url")
                .long("frontend-url")
                .help("Frontend base URL, used for CORS and cookie policy")
                .default_value("http://localhost:3000")
                .env("BOTFORGE_FRONTEND_URL"),
        )
        .arg(
            Arg::new("access-ttl-minutes")
                .long("access-ttl-minutes")
                .help("Access token lifetime in minutes")
                .default_value("30")
                .env("BOTFORGE_ACCESS_TTL_MINUTES")
                .value_parser(clap::value_parser!(i64)),
        )
        .arg(
            Arg::new("refresh-ttl-days")
                .long("refresh-ttl-days")
                .help("Refresh token lifetime in days")
                .default_value("7")
                .env("BOTFORGE_REFRESH_TTL_DAYS")
                .value_parser(clap::value_parser!(i64)),
        )
        .arg(
            Arg::new("rotate-refresh")
                .long("rotate-refresh")
                .help("Rotate the refresh token on every refresh (sliding session)")
                .env("BOTFORGE_ROTATE_REFRESH")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("verbosity")
                .short('v')
                .long("verbose")
                .help("Verbosity level: ERROR, WARN, INFO, DEBUG, TRACE (default: ERROR)")
                .env("BOTFORGE_LOG_LEVEL")
                .global(true)
                .action(ArgAction::Count)
                .value_parser(validator_log_level()),
        )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new() {
        let command = new();

        assert_eq!(command.get_name(), "botforge");
        assert_eq!(
            command.get_about().unwrap().to_string(),
            "Custom chatbot backend: authentication and credential lifecycle"
        );
        assert_eq!(
            command.get_version().unwrap().to_string(),
            env!("CARGO_PKG_VERSION")
        );
    }

    #[test]
    fn test_check_defaults() {
        let command = new();
        let matches = command.get_matches_from(vec![
            "botforge",
            "--dsn",
            "postgres://localhost/botforge",
            "--secret-key",
            "0123456789abcdef0123456789abcdef",
        ]);

        assert_eq!(matches.get_one::<u16>("port"), Some(&8080));
        assert_eq!(
            matches.get_one::<String>("dsn").map(String::as_str),
            Some("postgres://localhost/botforge")
        );
        assert_eq!(matches.get_one::<i64>("access-ttl-minutes"), Some(&30));
        assert_eq!(matches.get_one::<i64>("refresh-ttl-days"), Some(&7));
        assert!(!matches.get_flag("rotate-refresh"));
    }

    #[test]
    fn test_env_overrides() {
        temp_env::with_vars(
            [
                ("BOTFORGE_PORT", Some("9090")),
                ("BOTFORGE_ROTATE_REFRESH", Some("true")),
            ],
            || {
                let command = new();
                let matches = command.get_matches_from(vec![
                    "botforge",
                    "--dsn",
                    "postgres://localhost/botforge",
                    "--secret-key",
                    "0123456789abcdef0123456789abcdef",
                ]);

                assert_eq!(matches.get_one::<u16>("port"), Some(&9090));
                assert!(matches.get_flag("rotate-refresh"));
            },
        );
    }

    #[test]
    fn test_command_is_well_formed() {
        new().debug_assert();
    }
}
