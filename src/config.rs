use std::env;
use std::str::FromStr;

/// Runtime configuration, assembled once at startup from environment
/// variables (a `.env` file is loaded first when present).
///
/// An integration missing its credentials is simply absent from the config
/// and the corresponding client is never constructed — requests that need it
/// get a 503. Missing credentials are never a startup failure.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub poller: PollerConfig,
    pub google: Option<GoogleConfig>,
    pub recall: Option<RecallConfig>,
    pub openai: Option<OpenAiConfig>,
    pub linkedin: Option<LinkedinConfig>,
    pub facebook: Option<FacebookConfig>,
}

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub bind: String,
    pub port: u16,
    /// Externally reachable base URL of this backend; OAuth redirect URIs
    /// are derived from it.
    pub public_base_url: String,
    /// Where OAuth callbacks redirect the browser after success.
    pub frontend_base_url: String,
    pub cors_origins: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct PollerConfig {
    pub interval_secs: u64,
    pub error_backoff_secs: u64,
}

#[derive(Debug, Clone)]
pub struct GoogleConfig {
    pub client_id: String,
    pub client_secret: String,
    pub redirect_uri: String,
}

#[derive(Debug, Clone)]
pub struct RecallConfig {
    pub api_key: String,
    pub base_url: String,
    /// Bot ids to start tracking on boot. State is process memory, so bots
    /// dispatched by a previous run are otherwise forgotten on restart.
    pub seed_bot_ids: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct OpenAiConfig {
    pub api_key: String,
    pub base_url: String,
    pub model: String,
}

#[derive(Debug, Clone)]
pub struct LinkedinConfig {
    pub client_id: String,
    pub client_secret: String,
}

#[derive(Debug, Clone)]
pub struct FacebookConfig {
    pub app_id: String,
    pub app_secret: String,
}

fn default_bind() -> String {
    "0.0.0.0".to_string()
}
fn default_port() -> u16 {
    8000
}
fn default_public_base_url() -> String {
    "http://localhost:8000".to_string()
}
fn default_frontend_base_url() -> String {
    "http://localhost:3000".to_string()
}
fn default_poll_interval_secs() -> u64 {
    120
}
fn default_poll_error_backoff_secs() -> u64 {
    60
}
fn default_recall_base_url() -> String {
    "https://us-west-2.recall.ai/api/v1".to_string()
}
fn default_openai_base_url() -> String {
    "https://api.openai.com/v1".to_string()
}
fn default_openai_model() -> String {
    "gpt-3.5-turbo".to_string()
}

impl AppConfig {
    pub fn from_env() -> Self {
        let public_base_url =
            env_or("PUBLIC_BASE_URL", &default_public_base_url());
        let frontend_base_url =
            env_or("FRONTEND_BASE_URL", &default_frontend_base_url());

        let server = ServerConfig {
            bind: env_or("RECAPD_BIND", &default_bind()),
            port: env_parse("RECAPD_PORT", default_port()),
            cors_origins: env_opt("CORS_ORIGINS")
                .map(|v| split_csv(&v))
                .unwrap_or_else(|| vec![frontend_base_url.clone()]),
            public_base_url,
            frontend_base_url,
        };

        let poller = PollerConfig {
            interval_secs: env_parse("POLL_INTERVAL_SECS", default_poll_interval_secs()),
            error_backoff_secs: env_parse(
                "POLL_ERROR_BACKOFF_SECS",
                default_poll_error_backoff_secs(),
            ),
        };

        let google = match (env_opt("GOOGLE_CLIENT_ID"), env_opt("GOOGLE_CLIENT_SECRET")) {
            (Some(client_id), Some(client_secret)) => Some(GoogleConfig {
                client_id,
                client_secret,
                redirect_uri: env_or(
                    "GOOGLE_REDIRECT_URI",
                    &format!("{}/auth/google/callback", server.public_base_url),
                ),
            }),
            _ => None,
        };

        let recall = env_opt("RECALL_API_KEY").map(|api_key| RecallConfig {
            api_key,
            base_url: env_or("RECALL_BASE_URL", &default_recall_base_url()),
            seed_bot_ids: env_opt("RECALL_SEED_BOT_IDS")
                .map(|v| split_csv(&v))
                .unwrap_or_default(),
        });

        let openai = env_opt("OPENAI_API_KEY").map(|api_key| OpenAiConfig {
            api_key,
            base_url: env_or("OPENAI_BASE_URL", &default_openai_base_url()),
            model: env_or("OPENAI_MODEL", &default_openai_model()),
        });

        let linkedin = match (env_opt("LINKEDIN_CLIENT_ID"), env_opt("LINKEDIN_CLIENT_SECRET")) {
            (Some(client_id), Some(client_secret)) => Some(LinkedinConfig {
                client_id,
                client_secret,
            }),
            _ => None,
        };

        let facebook = match (env_opt("FACEBOOK_APP_ID"), env_opt("FACEBOOK_APP_SECRET")) {
            (Some(app_id), Some(app_secret)) => Some(FacebookConfig { app_id, app_secret }),
            _ => None,
        };

        Self {
            server,
            poller,
            google,
            recall,
            openai,
            linkedin,
            facebook,
        }
    }
}

/// A set env var with a non-empty value, or None.
fn env_opt(name: &str) -> Option<String> {
    env::var(name).ok().filter(|v| !v.trim().is_empty())
}

fn env_or(name: &str, default: &str) -> String {
    env_opt(name).unwrap_or_else(|| default.to_string())
}

fn env_parse<T: FromStr + Copy>(name: &str, default: T) -> T {
    env_opt(name)
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

fn split_csv(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_csv() {
        assert_eq!(
            split_csv("a, b ,c"),
            vec!["a".to_string(), "b".to_string(), "c".to_string()]
        );
        assert_eq!(split_csv(""), Vec::<String>::new());
        assert_eq!(split_csv(" , ,"), Vec::<String>::new());
    }

    #[test]
    fn test_defaults() {
        assert_eq!(default_port(), 8000);
        assert_eq!(default_poll_interval_secs(), 120);
        assert_eq!(default_poll_error_backoff_secs(), 60);
        assert!(default_recall_base_url().starts_with("https://"));
    }
}
