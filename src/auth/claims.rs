use serde::{Deserialize, Serialize};

/// JWT claims issued by the marketplace auth service
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// Subject (user ID)
    pub sub: String,

    /// Expiration (Unix timestamp)
    pub exp: i64,

    /// Issued at (Unix timestamp)
    #[serde(default)]
    pub iat: Option<i64>,

    /// Issuer - checked only when configured
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub iss: Option<String>,

    /// User email - optional
    #[serde(default)]
    pub email: Option<String>,

    /// Marketplace role: client, freelancer, admin or agent
    #[serde(default)]
    pub role: Option<String>,
}
