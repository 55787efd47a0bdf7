use crate::auth::jwt::generate_secret_string;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AuthConfig {
    pub jwt_secret: String,
    pub session_ttl_secs: u64,
}

impl Default for AuthConfig {
    fn default() -> Self {
        AuthConfig {
            jwt_secret: generate_secret_string(32)
                .unwrap_or_else(|_| uuid::Uuid::new_v4().simple().to_string()),
            session_ttl_secs: 24 * 60 * 60,
        }
    }
}
