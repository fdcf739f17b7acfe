use anyhow::{Context, Result};

pub const DEFAULT_SENDGRID_API_URL: &str = "https://api.sendgrid.com/v3";

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub auth: AuthConfig,
    pub email: EmailConfig,
    pub store: StoreDefaults,
}

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub port: u16,
}

#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
}

#[derive(Debug, Clone)]
pub struct AuthConfig {
    pub jwt_secret: String,
    pub token_ttl_minutes: i64,
}

#[derive(Debug, Clone)]
pub struct EmailConfig {
    /// Without a key every email is a logged no-op.
    pub sendgrid_api_key: Option<String>,
    pub api_url: String,
    pub from: String,
    pub admin_email: String,
}

/// Values used to seed the settings row the first time it is read.
#[derive(Debug, Clone)]
pub struct StoreDefaults {
    pub whatsapp_phone: String,
}

/// Reads the configuration from the process environment.
///
/// Call [`crate::bootstrap::init_env`] first so `.env` files are honoured.
pub fn load() -> Result<AppConfig> {
    from_lookup(|name| std::env::var(name).ok())
}

/// Builds the configuration from an arbitrary variable source.
pub fn from_lookup<F>(lookup: F) -> Result<AppConfig>
where
    F: Fn(&str) -> Option<String>,
{
    let required = |name: &str| {
        lookup(name)
            .filter(|value| !value.is_empty())
            .with_context(|| format!("Missing required env var: {}", name))
    };
    let or_default = |name: &str, default: &str| lookup(name).unwrap_or_else(|| default.to_string());

    let port = or_default("PORT", "5000")
        .parse::<u16>()
        .context("PORT must be a valid port number")?;
    let max_connections = or_default("DATABASE_MAX_CONNECTIONS", "10")
        .parse::<u32>()
        .context("DATABASE_MAX_CONNECTIONS must be a positive integer")?;
    let token_ttl_minutes = or_default("JWT_TTL_MINUTES", "60")
        .parse::<i64>()
        .context("JWT_TTL_MINUTES must be an integer")?;

    Ok(AppConfig {
        server: ServerConfig { port },
        database: DatabaseConfig {
            url: required("DATABASE_URL")?,
            max_connections,
        },
        auth: AuthConfig {
            jwt_secret: required("JWT_SECRET")?,
            token_ttl_minutes,
        },
        email: EmailConfig {
            sendgrid_api_key: lookup("SENDGRID_API_KEY").filter(|key| !key.is_empty()),
            api_url: or_default("SENDGRID_API_URL", DEFAULT_SENDGRID_API_URL),
            from: or_default("EMAIL_FROM", "no-reply@adunnifoods.com"),
            admin_email: or_default("ADMIN_EMAIL", "admin@adunnifoods.com"),
        },
        store: StoreDefaults {
            whatsapp_phone: or_default("WHATSAPP_PHONE", "2347030322419"),
        },
    })
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn lookup_from(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| vars.get(name).cloned()
    }

    #[test]
    fn defaults_apply_when_optional_vars_are_missing() {
        let config = from_lookup(lookup_from(&[
            ("DATABASE_URL", "postgres://localhost/adunni"),
            ("JWT_SECRET", "secret"),
        ]))
        .unwrap();

        assert_eq!(config.server.port, 5000);
        assert_eq!(config.database.max_connections, 10);
        assert_eq!(config.auth.token_ttl_minutes, 60);
        assert!(config.email.sendgrid_api_key.is_none());
        assert_eq!(config.email.api_url, DEFAULT_SENDGRID_API_URL);
        assert_eq!(config.store.whatsapp_phone, "2347030322419");
    }

    #[test]
    fn missing_jwt_secret_is_an_error() {
        let err = from_lookup(lookup_from(&[("DATABASE_URL", "postgres://localhost/adunni")]))
            .unwrap_err();
        assert!(err.to_string().contains("JWT_SECRET"));
    }

    #[test]
    fn invalid_port_is_an_error() {
        let result = from_lookup(lookup_from(&[
            ("DATABASE_URL", "postgres://localhost/adunni"),
            ("JWT_SECRET", "secret"),
            ("PORT", "not-a-port"),
        ]));
        assert!(result.is_err());
    }

    #[test]
    fn empty_sendgrid_key_disables_email() {
        let config = from_lookup(lookup_from(&[
            ("DATABASE_URL", "postgres://localhost/adunni"),
            ("JWT_SECRET", "secret"),
            ("SENDGRID_API_KEY", ""),
        ]))
        .unwrap();
        assert!(config.email.sendgrid_api_key.is_none());
    }
}
