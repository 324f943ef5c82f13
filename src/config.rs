/*!
 * Site Configuration
 * Everything the running service reads from the environment, besides the database
 */
use bcrypt::{hash, DEFAULT_COST};
use std::path::PathBuf;

pub const DEFAULT_JWT_SECRET: &str = "default-jwt-secret-change-in-production";

fn env_or(key: &str, fallback: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| fallback.to_string())
}

/// Fallback values for unset profile settings.
#[derive(Debug, Clone)]
pub struct ProfileDefaults {
    pub name: String,
    pub title: String,
    pub linkedin_url: String,
    pub instagram_url: String,
    pub youtube_url: String,
    pub background_image_url: String,
}

impl Default for ProfileDefaults {
    fn default() -> Self {
        Self {
            name: "Portfolio".to_string(),
            title: "Creative Technologist".to_string(),
            linkedin_url: String::new(),
            instagram_url: String::new(),
            youtube_url: String::new(),
            background_image_url: String::new(),
        }
    }
}

impl ProfileDefaults {
    pub fn from_env() -> Self {
        let d = Self::default();
        Self {
            name: env_or("PROFILE_DEFAULT_NAME", &d.name),
            title: env_or("PROFILE_DEFAULT_TITLE", &d.title),
            linkedin_url: env_or("PROFILE_DEFAULT_LINKEDIN_URL", &d.linkedin_url),
            instagram_url: env_or("PROFILE_DEFAULT_INSTAGRAM_URL", &d.instagram_url),
            youtube_url: env_or("PROFILE_DEFAULT_YOUTUBE_URL", &d.youtube_url),
            background_image_url: env_or(
                "PROFILE_DEFAULT_BACKGROUND_IMAGE_URL",
                &d.background_image_url,
            ),
        }
    }
}

/// Single-admin credentials and token signing.
#[derive(Clone)]
pub struct AuthConfig {
    pub jwt_secret: String,
    pub admin_password_hash: String,
    pub token_ttl_hours: i64,
}

impl std::fmt::Debug for AuthConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthConfig")
            .field("jwt_secret", &"<redacted>")
            .field("admin_password_hash", &"<redacted>")
            .field("token_ttl_hours", &self.token_ttl_hours)
            .finish()
    }
}

impl AuthConfig {
    /// `ADMIN_PASSWORD_HASH` takes precedence over `ADMIN_PASSWORD`, which is
    /// hashed at startup. With neither set no password will verify.
    pub fn from_env() -> Self {
        let admin_password_hash = match std::env::var("ADMIN_PASSWORD_HASH") {
            Ok(h) => h,
            Err(_) => match std::env::var("ADMIN_PASSWORD") {
                Ok(plain) => hash(plain, DEFAULT_COST).unwrap_or_else(|e| {
                    eprintln!("Failed to hash ADMIN_PASSWORD: {}", e);
                    String::new()
                }),
                Err(_) => String::new(),
            },
        };

        Self {
            jwt_secret: env_or("JWT_SECRET", DEFAULT_JWT_SECRET),
            admin_password_hash,
            token_ttl_hours: std::env::var("TOKEN_TTL_HOURS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(12),
        }
    }

    pub fn uses_default_secret(&self) -> bool {
        self.jwt_secret.is_empty() || self.jwt_secret == DEFAULT_JWT_SECRET
    }
}

#[derive(Debug, Clone)]
pub struct SiteConfig {
    pub environment: String,
    pub site_url: String,
    pub site_title: String,
    pub site_description: String,
    pub upload_dir: PathBuf,
    /// URL prefix uploaded files are served under.
    pub upload_url_prefix: String,
    pub public_cache_secs: u64,
    pub profile_defaults: ProfileDefaults,
    pub auth: AuthConfig,
}

impl SiteConfig {
    pub fn from_env() -> Self {
        Self {
            environment: env_or("ENVIRONMENT", "development"),
            site_url: env_or("SITE_URL", "http://localhost:3000")
                .trim_end_matches('/')
                .to_string(),
            site_title: env_or("SITE_TITLE", "Portfolio"),
            site_description: env_or("SITE_DESCRIPTION", "Latest posts and projects"),
            upload_dir: PathBuf::from(env_or("UPLOAD_DIR", "uploads")),
            upload_url_prefix: "/uploads".to_string(),
            public_cache_secs: std::env::var("PUBLIC_CACHE_SECS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(60),
            profile_defaults: ProfileDefaults::from_env(),
            auth: AuthConfig::from_env(),
        }
    }

    pub fn is_production(&self) -> bool {
        self.environment == "production"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_secret_detection() {
        let auth = AuthConfig {
            jwt_secret: DEFAULT_JWT_SECRET.to_string(),
            admin_password_hash: String::new(),
            token_ttl_hours: 12,
        };
        assert!(auth.uses_default_secret());

        let auth = AuthConfig {
            jwt_secret: "a-long-random-secret".to_string(),
            ..auth
        };
        assert!(!auth.uses_default_secret());
    }

    #[test]
    fn test_debug_redacts_secrets() {
        let auth = AuthConfig {
            jwt_secret: "super-secret".to_string(),
            admin_password_hash: "$2b$04$hash".to_string(),
            token_ttl_hours: 12,
        };
        let printed = format!("{:?}", auth);
        assert!(!printed.contains("super-secret"));
        assert!(!printed.contains("$2b$"));
    }

    #[test]
    fn test_from_env_has_sane_defaults() {
        let config = SiteConfig::from_env();
        assert!(config.public_cache_secs > 0 || std::env::var("PUBLIC_CACHE_SECS").is_ok());
        assert!(!config.site_url.ends_with('/'));
        assert_eq!(config.upload_url_prefix, "/uploads");
    }
}
