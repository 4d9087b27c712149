use secrecy::SecretString;

#[derive(Debug, Clone)]
pub struct GlobalArgs {
    pub provider_url: String,
    pub provider_key: SecretString,
    pub poll_interval: u64,
    pub resume_token: Option<SecretString>,
}

impl GlobalArgs {
    #[must_use]
    pub fn new(provider_url: String) -> Self {
        Self {
            provider_url,
            provider_key: SecretString::default(),
            poll_interval: 60,
            resume_token: None,
        }
    }

    pub fn set_key(&mut self, key: SecretString) {
        self.provider_key = key;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use secrecy::ExposeSecret;

    #[test]
    fn test_global_args() {
        let url = "https://id.example.com".to_string();
        let args = GlobalArgs::new(url);
        assert_eq!(args.provider_url, "https://id.example.com");
        assert_eq!(args.provider_key.expose_secret(), "");
        assert_eq!(args.poll_interval, 60);
        assert!(args.resume_token.is_none());
    }

    #[test]
    fn test_set_key() {
        let mut args = GlobalArgs::new("https://id.example.com".to_string());
        args.set_key(SecretString::from("anon-key".to_string()));
        assert_eq!(args.provider_key.expose_secret(), "anon-key");
    }
}
