use crate::cli::{actions::Action, globals::GlobalArgs};
use anyhow::Result;
use secrecy::SecretString;

pub fn handler(matches: &clap::ArgMatches) -> Result<Action> {
    let provider_url = matches
        .get_one("provider-url")
        .map(|s: &String| s.to_string())
        .ok_or_else(|| anyhow::anyhow!("missing required argument: --provider-url"))?;

    let mut globals = GlobalArgs::new(provider_url);

    let provider_key = matches
        .get_one("provider-key")
        .map(|s: &String| SecretString::from(s.to_string()))
        .ok_or_else(|| anyhow::anyhow!("missing required argument: --provider-key"))?;

    globals.set_key(provider_key);

    globals.poll_interval = matches.get_one::<u64>("poll-interval").copied().unwrap_or(60);

    globals.resume_token = matches
        .get_one("resume-token")
        .map(|s: &String| SecretString::from(s.to_string()));

    Ok(Action::Server {
        port: matches.get_one::<u16>("port").copied().unwrap_or(8080),
        globals,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::commands;
    use secrecy::ExposeSecret;

    #[test]
    fn test_handler_builds_globals() {
        let matches = commands::new().get_matches_from(vec![
            "gatehouse",
            "--port",
            "9090",
            "--provider-url",
            "https://id.example.com",
            "--provider-key",
            "anon-key",
            "--poll-interval",
            "30",
        ]);

        let Action::Server { port, globals } = handler(&matches).unwrap();

        assert_eq!(port, 9090);
        assert_eq!(globals.provider_url, "https://id.example.com");
        assert_eq!(globals.provider_key.expose_secret(), "anon-key");
        assert_eq!(globals.poll_interval, 30);
        assert!(globals.resume_token.is_none());
    }
}
