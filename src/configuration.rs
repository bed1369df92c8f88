use config::ConfigError;

#[derive(serde::Deserialize, Clone)]
pub struct Settings {
    pub security: SecuritySettings,
}

/// Security settings for the authentication core.
///
/// Keys are process-wide secrets: loaded once at startup, never mutated,
/// never logged. All durations are in seconds.
#[derive(serde::Deserialize, Clone)]
pub struct SecuritySettings {
    /// HMAC secret for signing access tokens.
    pub jwt_secret: String,
    /// Base64-encoded 32-byte key for the reset-link cipher.
    pub cipher_key: String,
    pub issuer: String,
    /// Base URL the encrypted reset token is appended to.
    pub reset_link_base_url: String,
    #[serde(default = "default_access_token_expiry")]
    pub access_token_expiry: i64,
    #[serde(default = "default_refresh_token_expiry")]
    pub refresh_token_expiry: i64,
    #[serde(default = "default_reset_token_expiry")]
    pub reset_token_expiry: i64,
    #[serde(default = "default_bcrypt_cost")]
    pub bcrypt_cost: u32,
    #[serde(default = "default_max_login_attempts")]
    pub max_login_attempts: u32,
    #[serde(default = "default_lockout_duration")]
    pub lockout_duration: i64,
    /// Whether refresh cookies carry the `Secure` attribute. Off for local
    /// development over plain HTTP.
    #[serde(default = "default_secure_cookies")]
    pub secure_cookies: bool,
}

fn default_access_token_expiry() -> i64 {
    1800 // 30 minutes
}

fn default_refresh_token_expiry() -> i64 {
    604_800 // 7 days
}

fn default_reset_token_expiry() -> i64 {
    900 // 15 minutes
}

fn default_bcrypt_cost() -> u32 {
    12
}

fn default_max_login_attempts() -> u32 {
    5
}

fn default_lockout_duration() -> i64 {
    300 // 5 minutes
}

fn default_secure_cookies() -> bool {
    true
}

impl SecuritySettings {
    /// Rejects settings outside the supported ranges. Called once at startup
    /// by the embedding application.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.jwt_secret.len() < 32 {
            return Err(ConfigError::Message(
                "jwt_secret must be at least 32 bytes".to_string(),
            ));
        }
        if !(10..=15).contains(&self.bcrypt_cost) {
            return Err(ConfigError::Message(
                "bcrypt_cost must be between 10 and 15".to_string(),
            ));
        }
        if !(3..=10).contains(&self.max_login_attempts) {
            return Err(ConfigError::Message(
                "max_login_attempts must be between 3 and 10".to_string(),
            ));
        }
        if self.lockout_duration < 300 {
            return Err(ConfigError::Message(
                "lockout_duration must be at least 300 seconds".to_string(),
            ));
        }
        Ok(())
    }
}

pub fn get_configuration() -> Result<Settings, ConfigError> {
    let settings = config::Config::builder()
        .add_source(config::File::with_name("configuration").required(false))
        .add_source(config::Environment::with_prefix("HRGATE").separator("__"))
        .build()?;
    settings.try_deserialize::<Settings>()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn settings() -> SecuritySettings {
        SecuritySettings {
            jwt_secret: "test-secret-key-at-least-32-characters-long".to_string(),
            cipher_key: "AAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAA=".to_string(),
            issuer: "hrgate".to_string(),
            reset_link_base_url: "https://hr.example.com/reset".to_string(),
            access_token_expiry: default_access_token_expiry(),
            refresh_token_expiry: default_refresh_token_expiry(),
            reset_token_expiry: default_reset_token_expiry(),
            bcrypt_cost: default_bcrypt_cost(),
            max_login_attempts: default_max_login_attempts(),
            lockout_duration: default_lockout_duration(),
            secure_cookies: true,
        }
    }

    #[test]
    fn defaults_pass_validation() {
        assert!(settings().validate().is_ok());
    }

    #[test]
    fn short_jwt_secret_rejected() {
        let mut s = settings();
        s.jwt_secret = "short".to_string();
        assert!(s.validate().is_err());
    }

    #[test]
    fn bcrypt_cost_range_enforced() {
        let mut s = settings();
        s.bcrypt_cost = 4;
        assert!(s.validate().is_err());
        s.bcrypt_cost = 31;
        assert!(s.validate().is_err());
    }

    #[test]
    fn lockout_floor_enforced() {
        let mut s = settings();
        s.lockout_duration = 60;
        assert!(s.validate().is_err());
    }
}
