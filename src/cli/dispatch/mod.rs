use crate::cli::actions::Action;
use anyhow::Result;
use secrecy::SecretString;

pub fn handler(matches: &clap::ArgMatches) -> Result<Action> {
    Ok(Action::Server {
        port: matches.get_one::<u16>("port").copied().unwrap_or(8080),
        dsn: matches
            .get_one("dsn")
            .map(|s: &String| s.to_string())
            .ok_or_else(|| anyhow::anyhow!("missing required argument: --dsn"))?,
        secret: matches
            .get_one("secret-key")
            .map(|s: &String| SecretString::from(s.to_string()))
            .ok_or_else(|| anyhow::anyhow!("missing required argument: --secret-key"))?,
        frontend_url: matches
            .get_one("frontend-url")
            .map_or_else(|| "http://localhost:3000".to_string(), |s: &String| s.to_string()),
        access_ttl_minutes: matches
            .get_one::<i64>("access-ttl-minutes")
            .copied()
            .unwrap_or(30),
        refresh_ttl_days: matches
            .get_one::<i64>("refresh-ttl-days")
            .copied()
            .unwrap_or(7),
        rotate_refresh: matches.get_flag("rotate-refresh"),
    })
}

#[cfg(test)]
mod tests {
    use super::handler;
    use crate::cli::{actions::Action, commands};
    use secrecy::ExposeSecret;

    #[test]
    fn dispatch_builds_server_action() {
        let matches = commands::new().get_matches_from(vec![
            "botforge",
            "--dsn",
            "postgres://localhost/botforge",
            "--secret-key",
            "0123456789abcdef0123456789abcdef",
            "--rotate-refresh",
        ]);

        let Action::Server {
            port,
            dsn,
            secret,
            frontend_url,
            access_ttl_minutes,
            refresh_ttl_days,
            rotate_refresh,
        } = handler(&matches).unwrap();

        assert_eq!(port, 8080);
        assert_eq!(dsn, "postgres://localhost/botforge");
        assert_eq!(secret.expose_secret(), "0123456789abcdef0123456789abcdef");
        assert_eq!(frontend_url, "http://localhost:3000");
        assert_eq!(access_ttl_minutes, 30);
        assert_eq!(refresh_ttl_days, 7);
        assert!(rotate_refresh);
    }
}
