use super::ScrapiConfig;

impl ScrapiConfig {
    pub fn apply_env_overrides(&mut self) {
        self.apply_overrides_from(|key| std::env::var(key).ok());
    }

    /// Apply overrides from an arbitrary variable source. Empty values are
    /// ignored.
    pub fn apply_overrides_from(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        let var = |keys: &[&str]| {
            keys.iter()
                .find_map(|key| lookup(key).filter(|value| !value.is_empty()))
        };

        if let Some(engine) = var(&["SCRAPI_ENGINE"]) {
            self.engine = engine;
        }

        if let Some(url) = var(&["SCRAPI_URL"]) {
            self.connection.url = url.trim_end_matches('/').to_string();
        }

        if let Some(client_id) = var(&["SCRAPI_CLIENT_ID", "DATATRAILS_CLIENT_ID"]) {
            self.connection.client_id = client_id;
        }

        if let Some(secret) = var(&["SCRAPI_CLIENT_SECRET", "DATATRAILS_CLIENT_SECRET"]) {
            self.connection.client_secret = secret;
        }

        if let Some(level) = var(&["SCRAPI_LOG_LEVEL"]) {
            self.connection.log_level = level;
        }

        if let Some(interval) = var(&["SCRAPI_POLL_INTERVAL_MS"])
            && let Ok(interval) = interval.parse::<u64>()
        {
            self.poll.interval_ms = interval;
        }
    }
}
