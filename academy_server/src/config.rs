use std::{env, io::Write};

use academy_common::{parse_boolean_flag, Secret};
use chrono::Duration;
use log::*;
use rand::{thread_rng, RngCore};
use razorpay_tools::RazorpayConfig;
use serde_json::json;
use tempfile::NamedTempFile;

use crate::errors::ServerError;

const DEFAULT_ACADEMY_HOST: &str = "127.0.0.1";
const DEFAULT_ACADEMY_PORT: u16 = 8360;
const DEFAULT_DB_MAX_CONNECTIONS: u32 = 25;
const DEFAULT_TOKEN_TTL: Duration = Duration::hours(24);
const MIN_JWT_SECRET_LEN: usize = 32;

#[derive(Clone, Debug)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub database_url: String,
    pub db_max_connections: u32,
    pub auth: AuthConfig,
    pub gateway: GatewayConfig,
    /// If true, the X-Forwarded-For header will be used to determine the client's IP address, rather than the
    /// connection's remote address.
    pub use_x_forwarded_for: bool,
    /// If true, the Forwarded header will be used to determine the client's IP address.
    pub use_forwarded: bool,
    /// Apply the embedded schema migrations at start-up.
    pub run_migrations: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_ACADEMY_HOST.to_string(),
            port: DEFAULT_ACADEMY_PORT,
            database_url: String::default(),
            db_max_connections: DEFAULT_DB_MAX_CONNECTIONS,
            auth: AuthConfig::default(),
            gateway: GatewayConfig::default(),
            use_x_forwarded_for: false,
            use_forwarded: false,
            run_migrations: true,
        }
    }
}

impl ServerConfig {
    pub fn new(host: &str, port: u16) -> Self {
        Self { host: host.to_string(), port, ..Default::default() }
    }

    pub fn from_env_or_default() -> Self {
        let host = env::var("ACADEMY_HOST").ok().unwrap_or_else(|| DEFAULT_ACADEMY_HOST.into());
        let port = env::var("ACADEMY_PORT")
            .map(|s| {
                s.parse::<u16>().unwrap_or_else(|e| {
                    error!(
                        "🪛️ {s} is not a valid port for ACADEMY_PORT. {e} Using the default, {DEFAULT_ACADEMY_PORT}, \
                         instead."
                    );
                    DEFAULT_ACADEMY_PORT
                })
            })
            .ok()
            .unwrap_or(DEFAULT_ACADEMY_PORT);
        let database_url = env::var("ACADEMY_DATABASE_URL").ok().unwrap_or_else(|| {
            error!("🪛️ ACADEMY_DATABASE_URL is not set. Please set it to the URL for the academy database.");
            String::default()
        });
        let db_max_connections = env::var("ACADEMY_DB_MAX_CONNECTIONS")
            .ok()
            .and_then(|s| {
                s.parse::<u32>()
                    .map_err(|e| warn!("🪛️ Invalid configuration value for ACADEMY_DB_MAX_CONNECTIONS. {e}"))
                    .ok()
            })
            .filter(|n| *n > 0)
            .unwrap_or(DEFAULT_DB_MAX_CONNECTIONS);
        let auth = AuthConfig::try_from_env().unwrap_or_else(|e| {
            warn!(
                "🪛️ Could not load the authentication configuration from environment variables. {e}. Reverting to the \
                 default configuration."
            );
            AuthConfig::default()
        });
        let gateway = GatewayConfig::from_env_or_defaults();
        let use_x_forwarded_for = parse_boolean_flag(env::var("ACADEMY_USE_X_FORWARDED_FOR").ok(), false);
        let use_forwarded = parse_boolean_flag(env::var("ACADEMY_USE_FORWARDED").ok(), false);
        let run_migrations = parse_boolean_flag(env::var("ACADEMY_RUN_MIGRATIONS").ok(), true);
        Self {
            host,
            port,
            database_url,
            db_max_connections,
            auth,
            gateway,
            use_x_forwarded_for,
            use_forwarded,
            run_migrations,
        }
    }
}

//-------------------------------------------------  GatewayConfig  ----------------------------------------------------
#[derive(Clone, Debug, Default)]
pub struct GatewayConfig {
    /// Key id, key secret, API url and request timeout for the REST client.
    pub api: RazorpayConfig,
    /// The secret the gateway signs webhook bodies with. This is configured separately from the key secret.
    pub webhook_secret: Secret<String>,
    /// If false, webhook signatures are not checked. **DANGER**
    pub webhook_checks: bool,
}

impl GatewayConfig {
    pub fn from_env_or_defaults() -> Self {
        let api = RazorpayConfig::new_from_env_or_default();
        let webhook_secret = env::var("ACADEMY_RAZORPAY_WEBHOOK_SECRET").ok().unwrap_or_else(|| {
            warn!(
                "🪛️ ACADEMY_RAZORPAY_WEBHOOK_SECRET is not set. Webhook notifications from the gateway will be \
                 rejected."
            );
            String::default()
        });
        let webhook_checks = parse_boolean_flag(env::var("ACADEMY_RAZORPAY_WEBHOOK_CHECKS").ok(), true);
        if !webhook_checks {
            warn!("🚨️ Webhook signature checks are DISABLED. Anyone can settle payments. Do not run like this in production.");
        }
        Self { api, webhook_secret: Secret::new(webhook_secret), webhook_checks }
    }
}

//-------------------------------------------------  AuthConfig  -------------------------------------------------------
#[derive(Clone, Debug)]
pub struct AuthConfig {
    /// The HS256 secret used to sign and verify access tokens.
    pub jwt_secret: Secret<String>,
    /// How long an access token stays valid.
    pub token_ttl: Duration,
    /// Sets the `Secure` attribute on the auth cookie.
    pub cookie_secure: bool,
}

impl Default for AuthConfig {
    fn default() -> Self {
        let mut tmpfile = NamedTempFile::new().ok().and_then(|f| f.keep().ok());
        warn!(
            "🚨️🚨️🚨️ The JWT secret has not been set. I'm using a random value for this session. DO NOT operate on \
             production like this since all sessions will be invalidated on restart. 🚨️🚨️🚨️"
        );
        let mut bytes = [0u8; MIN_JWT_SECRET_LEN];
        thread_rng().fill_bytes(&mut bytes);
        let secret = hex::encode(bytes);
        match &mut tmpfile {
            Some((f, p)) => {
                let key_data = json!({ "jwt_secret": secret }).to_string();
                match writeln!(f, "{key_data}") {
                    Ok(()) => warn!(
                        "🚨️🚨️🚨️ The JWT secret for this session was written to {}. If this is a production instance, \
                         you are doing it wrong! Set the ACADEMY_JWT_SECRET environment variable instead. 🚨️🚨️🚨️",
                        p.to_str().unwrap_or("???")
                    ),
                    Err(e) => warn!("🪛️ Could not write the JWT secret to the temporary file. {e}"),
                }
            },
            None => {
                warn!("🪛️ Could not create a temporary file to store the JWT secret. ");
            },
        }
        Self { jwt_secret: Secret::new(secret), token_ttl: DEFAULT_TOKEN_TTL, cookie_secure: true }
    }
}

impl AuthConfig {
    pub fn new<S: Into<String>>(jwt_secret: S) -> Self {
        Self { jwt_secret: Secret::new(jwt_secret.into()), token_ttl: DEFAULT_TOKEN_TTL, cookie_secure: true }
    }

    pub fn try_from_env() -> Result<Self, ServerError> {
        let secret = env::var("ACADEMY_JWT_SECRET")
            .map_err(|e| ServerError::ConfigurationError(format!("{e} [ACADEMY_JWT_SECRET]")))?;
        if secret.len() < MIN_JWT_SECRET_LEN {
            return Err(ServerError::ConfigurationError(format!(
                "ACADEMY_JWT_SECRET must be at least {MIN_JWT_SECRET_LEN} characters long"
            )));
        }
        let token_ttl = env::var("ACADEMY_TOKEN_TTL_HOURS")
            .map_err(|_| {
                info!(
                    "🪛️ ACADEMY_TOKEN_TTL_HOURS is not set. Using the default value of {} hrs.",
                    DEFAULT_TOKEN_TTL.num_hours()
                )
            })
            .and_then(|s| {
                s.parse::<i64>()
                    .map(Duration::hours)
                    .map_err(|e| warn!("🪛️ Invalid configuration value for ACADEMY_TOKEN_TTL_HOURS. {e}"))
            })
            .ok()
            .filter(|d| *d > Duration::zero())
            .unwrap_or(DEFAULT_TOKEN_TTL);
        let cookie_secure = parse_boolean_flag(env::var("ACADEMY_COOKIE_SECURE").ok(), true);
        Ok(Self { jwt_secret: Secret::new(secret), token_ttl, cookie_secure })
    }
}

//-------------------------------------------------  ServerOptions  ----------------------------------------------------
/// A subset of the server configuration that handlers need. It excludes secrets so that it can be handed to every
/// worker as app data.
#[derive(Clone, Copy, Debug)]
pub struct ServerOptions {
    pub use_x_forwarded_for: bool,
    pub use_forwarded: bool,
    pub cookie_secure: bool,
    pub token_ttl: Duration,
}

impl ServerOptions {
    pub fn from_config(config: &ServerConfig) -> Self {
        Self {
            use_x_forwarded_for: config.use_x_forwarded_for,
            use_forwarded: config.use_forwarded,
            cookie_secure: config.auth.cookie_secure,
            token_ttl: config.auth.token_ttl,
        }
    }
}

impl Default for ServerOptions {
    fn default() -> Self {
        Self { use_x_forwarded_for: false, use_forwarded: false, cookie_secure: true, token_ttl: DEFAULT_TOKEN_TTL }
    }
}
