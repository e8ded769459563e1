use std::env;
use std::fs;
use std::io;
use std::path::Path;

/// Process configuration, read once at startup.
///
/// Identity-provider and database values intentionally fall back to empty
/// strings instead of panicking: a missing value surfaces as a startup-step
/// failure (degraded application state) rather than a crash loop.
#[derive(Debug, Clone)]
pub struct Config {
    /// Identity provider authority URL, e.g. `https://login.example.com/tenant`.
    pub authority: String,
    /// Audience identifier the access tokens must be issued for.
    pub audience: String,
    /// Origin allowed by CORS.
    pub allowed_origin: String,
    /// Prefix every API route is mounted under, e.g. `/api/v1`.
    pub api_prefix: String,
    /// Version string reported by the health endpoint.
    pub api_version: String,
    pub server_host: String,
    pub server_port: u16,
    pub mongo_host: String,
    pub mongo_port: u16,
    /// Database name, also used as the authentication source.
    pub mongo_database: String,
    /// Path of the file holding the database username.
    pub mongo_username_file: String,
    /// Path of the file holding the database password.
    pub mongo_password_file: String,
}

impl Config {
    pub fn from_env() -> Self {
        Self {
            authority: env::var("AUTH_AUTHORITY").unwrap_or_default(),
            audience: env::var("AUTH_AUDIENCE").unwrap_or_default(),
            allowed_origin: env::var("ALLOWED_ORIGIN")
                .unwrap_or_else(|_| "http://localhost:3000".to_string()),
            api_prefix: env::var("API_PREFIX").unwrap_or_else(|_| "/api/v1".to_string()),
            api_version: env::var("API_VERSION").unwrap_or_else(|_| "1.0.0".to_string()),
            server_host: env::var("SERVER_HOST").unwrap_or_else(|_| "127.0.0.1".to_string()),
            server_port: env::var("SERVER_PORT")
                .unwrap_or_else(|_| "8080".to_string())
                .parse()
                .expect("SERVER_PORT must be a number"),
            mongo_host: env::var("MONGO_HOST").unwrap_or_else(|_| "localhost".to_string()),
            mongo_port: env::var("MONGO_PORT")
                .unwrap_or_else(|_| "27017".to_string())
                .parse()
                .expect("MONGO_PORT must be a number"),
            mongo_database: env::var("MONGO_DATABASE")
                .unwrap_or_else(|_| "noticeboard".to_string()),
            mongo_username_file: env::var("MONGO_USERNAME_FILE").unwrap_or_default(),
            mongo_password_file: env::var("MONGO_PASSWORD_FILE").unwrap_or_default(),
        }
    }

    pub fn server_url(&self) -> String {
        format!("http://{}:{}", self.server_host, self.server_port)
    }
}

/// Reads secret material from a file named by the configuration, trimming the
/// trailing newline most secret stores append.
pub fn read_secret_file(path: impl AsRef<Path>) -> io::Result<String> {
    let content = fs::read_to_string(path)?;
    Ok(content.trim_end_matches(['\r', '\n']).to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_from_env() {
        env::set_var("AUTH_AUTHORITY", "https://login.example.com/tenant");
        env::set_var("AUTH_AUDIENCE", "11111111-2222-3333-4444-555555555555");

        let config = Config::from_env();

        assert_eq!(config.authority, "https://login.example.com/tenant");
        assert_eq!(config.audience, "11111111-2222-3333-4444-555555555555");
        assert_eq!(config.server_port, 8080);
        assert_eq!(config.server_host, "127.0.0.1");
        assert_eq!(config.api_prefix, "/api/v1");
        assert_eq!(config.mongo_host, "localhost");
        assert_eq!(config.mongo_port, 27017);

        // Custom values win over defaults.
        env::set_var("SERVER_PORT", "3000");
        env::set_var("SERVER_HOST", "0.0.0.0");
        env::set_var("MONGO_PORT", "27018");

        let config = Config::from_env();

        assert_eq!(config.server_port, 3000);
        assert_eq!(config.server_host, "0.0.0.0");
        assert_eq!(config.server_url(), "http://0.0.0.0:3000");
        assert_eq!(config.mongo_port, 27018);
    }

    #[test]
    fn test_read_secret_file_trims_trailing_newline() {
        let path = env::temp_dir().join("noticeboard-secret-test");
        fs::write(&path, "s3cr3t\n").unwrap();

        assert_eq!(read_secret_file(&path).unwrap(), "s3cr3t");

        fs::remove_file(&path).unwrap();
        assert!(read_secret_file(&path).is_err());
    }
}
