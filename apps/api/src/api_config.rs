use std::env;
use std::net::{IpAddr, SocketAddr};
use std::str::FromStr;

use taskdeck_core::AppError;
use taskdeck_domain::{
    DEFAULT_FEEDBACK_COOLDOWN_STEP_MS, DEFAULT_FEEDBACK_MAX_ACTIONS,
    DEFAULT_FEEDBACK_STRIKE_RESET_MS, DEFAULT_FEEDBACK_WINDOW_MS, FeedbackLimits,
};
use taskdeck_infrastructure::{AppwriteCollections, AppwriteConfig};
use tracing_subscriber::EnvFilter;
use url::Url;

const DEFAULT_REDIS_KEY_PREFIX: &str = "taskdeck:documents";

#[derive(Debug, Clone)]
pub enum DocumentStoreConfig {
    InMemory,
    Postgres { database_url: String },
    Redis { redis_url: String, key_prefix: String },
    Appwrite(AppwriteConfig),
}

impl DocumentStoreConfig {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::InMemory => "memory",
            Self::Postgres { .. } => "postgres",
            Self::Redis { .. } => "redis",
            Self::Appwrite(_) => "appwrite",
        }
    }
}

#[derive(Debug, Clone)]
pub struct ApiConfig {
    pub migrate_only: bool,
    pub api_host: String,
    pub api_port: u16,
    pub frontend_url: String,
    pub document_store: DocumentStoreConfig,
    pub feedback_limits: FeedbackLimits,
}

impl ApiConfig {
    pub fn load() -> Result<Self, AppError> {
        let migrate_only = env::args().nth(1).as_deref() == Some("migrate");
        Self::from_lookup(migrate_only, |name| env::var(name).ok())
    }

    pub fn from_lookup<F>(migrate_only: bool, lookup: F) -> Result<Self, AppError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let variables = EnvLookup(lookup);

        let api_host = variables.or("API_HOST", "127.0.0.1");
        let api_port = variables
            .get("API_PORT")
            .and_then(|value| value.parse::<u16>().ok())
            .unwrap_or(3001);
        let frontend_url = variables.or("FRONTEND_URL", "http://localhost:3000");

        let document_store = match variables.or("DOCUMENT_STORE", "memory").as_str() {
            "memory" => DocumentStoreConfig::InMemory,
            "postgres" => DocumentStoreConfig::Postgres {
                database_url: variables.required("DATABASE_URL")?,
            },
            "redis" => DocumentStoreConfig::Redis {
                redis_url: variables.required("REDIS_URL")?,
                key_prefix: variables.or("REDIS_KEY_PREFIX", DEFAULT_REDIS_KEY_PREFIX),
            },
            "appwrite" => {
                let endpoint = variables.required("APPWRITE_ENDPOINT")?;
                let endpoint = Url::parse(&endpoint).map_err(|error| {
                    AppError::Validation(format!("invalid APPWRITE_ENDPOINT: {error}"))
                })?;
                let defaults = AppwriteCollections::default();
                DocumentStoreConfig::Appwrite(AppwriteConfig {
                    endpoint,
                    project_id: variables.required("APPWRITE_PROJECT_ID")?,
                    api_key: variables.required("APPWRITE_API_KEY")?,
                    database_id: variables.required("APPWRITE_DATABASE_ID")?,
                    collections: AppwriteCollections {
                        profiles: variables
                            .or("APPWRITE_PROFILES_COLLECTION_ID", defaults.profiles.as_str()),
                        presence: variables
                            .or("APPWRITE_PRESENCE_COLLECTION_ID", defaults.presence.as_str()),
                        notifications: variables.or(
                            "APPWRITE_NOTIFICATIONS_COLLECTION_ID",
                            defaults.notifications.as_str(),
                        ),
                    },
                })
            }
            other => {
                return Err(AppError::Validation(format!(
                    "DOCUMENT_STORE must be one of 'memory', 'postgres', 'redis' or 'appwrite', got '{other}'"
                )));
            }
        };

        let feedback_limits = FeedbackLimits::new(
            variables.number("FEEDBACK_WINDOW_MS", DEFAULT_FEEDBACK_WINDOW_MS)?,
            variables.number("FEEDBACK_MAX_ACTIONS", DEFAULT_FEEDBACK_MAX_ACTIONS)?,
            variables.number(
                "FEEDBACK_COOLDOWN_STEP_MS",
                DEFAULT_FEEDBACK_COOLDOWN_STEP_MS,
            )?,
            variables.number("FEEDBACK_STRIKE_RESET_MS", DEFAULT_FEEDBACK_STRIKE_RESET_MS)?,
        )?;

        Ok(Self {
            migrate_only,
            api_host,
            api_port,
            frontend_url,
            document_store,
            feedback_limits,
        })
    }

    pub fn socket_address(&self) -> Result<SocketAddr, AppError> {
        let host = IpAddr::from_str(&self.api_host).map_err(|error| {
            AppError::Internal(format!("invalid API_HOST '{}': {error}", self.api_host))
        })?;
        Ok(SocketAddr::from((host, self.api_port)))
    }
}

pub fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .compact()
        .init();
}

struct EnvLookup<F>(F);

impl<F> EnvLookup<F>
where
    F: Fn(&str) -> Option<String>,
{
    fn get(&self, name: &str) -> Option<String> {
        (self.0)(name).filter(|value| !value.trim().is_empty())
    }

    fn or(&self, name: &str, default: &str) -> String {
        self.get(name).unwrap_or_else(|| default.to_owned())
    }

    fn required(&self, name: &str) -> Result<String, AppError> {
        self.get(name)
            .ok_or_else(|| AppError::Validation(format!("{name} is required")))
    }

    fn number<T>(&self, name: &str, default: T) -> Result<T, AppError>
    where
        T: FromStr,
        T::Err: std::fmt::Display,
    {
        match self.get(name) {
            Some(value) => value
                .trim()
                .parse::<T>()
                .map_err(|error| AppError::Validation(format!("invalid {name}: {error}"))),
            None => Ok(default),
        }
    }
}
