use std::net::IpAddr;

/// Server configuration
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Address to bind the server to
    pub bind_address: IpAddr,
    /// Port to listen on
    pub port: u16,
    /// Messenger chat-bot token; absence disables the integration
    pub bot_token: Option<String>,
    /// Origin the chat bot deep-links players into
    pub webapp_url: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_address: IpAddr::from([0, 0, 0, 0]),
            port: 8000,
            bot_token: None,
            webapp_url: "https://sumo.lovza.ru".to_string(),
        }
    }
}

impl ServerConfig {
    /// Load config from environment or use defaults
    pub fn load_or_default() -> Self {
        let mut config = Self::default();

        if let Ok(addr) = std::env::var("BIND_ADDRESS") {
            if let Ok(parsed) = addr.parse() {
                config.bind_address = parsed;
            }
        }

        if let Ok(port) = std::env::var("PORT") {
            if let Ok(parsed) = port.parse() {
                config.port = parsed;
            }
        }

        if let Ok(token) = std::env::var("BOT_TOKEN") {
            if !token.is_empty() {
                config.bot_token = Some(token);
            }
        }

        if let Ok(url) = std::env::var("WEBAPP_URL") {
            config.webapp_url = url;
        }

        config
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = ServerConfig::default();
        assert_eq!(config.port, 8000);
        assert!(config.bind_address.is_unspecified());
        assert!(config.bot_token.is_none());
        assert!(config.webapp_url.starts_with("https://"));
    }
}
