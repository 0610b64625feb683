use std::net::SocketAddr;
use std::path::PathBuf;

use anyhow::{Context, Result, bail};

/// Placeholder JWT secrets that MUST NOT be used.
const PLACEHOLDER_SECRETS: &[&str] = &[
    "change-me-to-a-random-string",
    "dev-secret-change-me",
    "secret",
];

#[derive(Debug, Clone)]
pub struct Config {
    pub jwt_secret: String,
    pub db_path: PathBuf,
    pub upload_dir: PathBuf,
    pub addr: SocketAddr,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build the config from any key lookup. `from_env` passes the process
    /// environment.
    pub fn from_lookup(get: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let jwt_secret = get("NOVELLA_JWT_SECRET").unwrap_or_default();
        if jwt_secret.is_empty() || PLACEHOLDER_SECRETS.contains(&jwt_secret.as_str()) {
            bail!("NOVELLA_JWT_SECRET is unset or still a placeholder; set it in your .env file");
        }

        let host = get("NOVELLA_HOST").unwrap_or_else(|| "0.0.0.0".into());
        let port: u16 = get("NOVELLA_PORT")
            .unwrap_or_else(|| "3000".into())
            .parse()
            .context("NOVELLA_PORT must be a port number")?;
        let addr: SocketAddr = format!("{}:{}", host, port)
            .parse()
            .with_context(|| format!("invalid listen address {}:{}", host, port))?;

        let db_path: PathBuf = get("NOVELLA_DB_PATH").unwrap_or_else(|| "novella.db".into()).into();
        let upload_dir: PathBuf = get("NOVELLA_UPLOAD_DIR").unwrap_or_else(|| "./uploads".into()).into();

        Ok(Self {
            jwt_secret,
            db_path,
            upload_dir,
            addr,
        })
    }
}
