//! Wire types of the portal backend.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

/// Subscription tier of a partner, lowest first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PartnerTier {
    Lite,
    Pro,
    Elite,
    Black,
}

impl fmt::Display for PartnerTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PartnerTier::Lite => write!(f, "LITE"),
            PartnerTier::Pro => write!(f, "PRO"),
            PartnerTier::Elite => write!(f, "ELITE"),
            PartnerTier::Black => write!(f, "BLACK"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PartnerStatus {
    Pending,
    Approved,
    Rejected,
    Suspended,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Partner {
    pub id: String,
    pub company_name: String,
    pub contact_email: String,
    #[serde(default)]
    pub contact_phone: Option<String>,
    #[serde(default)]
    pub website: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    pub tier: PartnerTier,
    pub status: PartnerStatus,
    #[serde(default)]
    pub industry: Option<String>,
    #[serde(default)]
    pub monthly_volume: Option<u64>,
    #[serde(default)]
    pub rate_limit_tier: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ApiKeyEnvironment {
    Production,
    Sandbox,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ApiKeyStatus {
    Active,
    Revoked,
    Expired,
}

/// Credential issued to a partner/user pair.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiKey {
    pub id: String,
    pub name: String,
    pub partner_id: String,
    #[serde(default)]
    pub user_id: Option<String>,
    #[serde(default)]
    pub scopes: Vec<String>,
    pub environment: ApiKeyEnvironment,
    pub status: ApiKeyStatus,
    #[serde(default)]
    pub request_count: u64,
    #[serde(default)]
    pub last_used_at: Option<String>,
    /// Only present in the response that created the key.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateApiKey {
    pub name: String,
    pub scopes: Vec<String>,
    pub environment: ApiKeyEnvironment,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum UserRole {
    SuperAdmin,
    Admin,
    PartnerAdmin,
    PartnerUser,
    Developer,
    Viewer,
}

/// The signed-in user as returned by the login endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionUser {
    pub id: String,
    pub email: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default, alias = "avatar")]
    pub image: Option<String>,
    pub role: UserRole,
    #[serde(default)]
    pub partner_id: Option<String>,
    #[serde(default)]
    pub permissions: Value,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct LoginResponse {
    #[serde(default)]
    pub success: bool,
    #[serde(default)]
    pub data: Option<LoginData>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoginData {
    #[serde(default)]
    pub user: Option<SessionUser>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_partner_from_backend_json() {
        let partner: Partner = serde_json::from_value(json!({
            "id": "partner_enterprise_001",
            "companyName": "TechCorp Enterprise",
            "contactEmail": "contact@techcorp.com",
            "tier": "BLACK",
            "status": "APPROVED",
            "monthlyVolume": 1000000,
            "rateLimitTier": "enterprise"
        }))
        .unwrap();

        assert_eq!(partner.tier, PartnerTier::Black);
        assert_eq!(partner.status, PartnerStatus::Approved);
        assert_eq!(partner.monthly_volume, Some(1_000_000));
        assert_eq!(partner.website, None);
    }

    #[test]
    fn test_tier_ordering_and_display() {
        assert!(PartnerTier::Lite < PartnerTier::Pro);
        assert!(PartnerTier::Elite < PartnerTier::Black);
        assert_eq!(PartnerTier::Elite.to_string(), "ELITE");
    }

    #[test]
    fn test_api_key_from_backend_json() {
        let key: ApiKey = serde_json::from_value(json!({
            "id": "k1",
            "name": "Production API Key",
            "partnerId": "partner_enterprise_001",
            "scopes": ["read:market-data", "write:orders"],
            "environment": "PRODUCTION",
            "status": "ACTIVE",
            "requestCount": 42
        }))
        .unwrap();

        assert_eq!(key.environment, ApiKeyEnvironment::Production);
        assert_eq!(key.scopes.len(), 2);
        assert_eq!(key.key, None);
        assert!(serde_json::to_value(&key).unwrap().get("key").is_none());
    }

    #[test]
    fn test_session_user_accepts_avatar() {
        let user: SessionUser = serde_json::from_value(json!({
            "id": "user_admin_002",
            "email": "admin@trademate.com",
            "avatar": "https://example.com/a.png",
            "role": "PARTNER_ADMIN",
            "partnerId": "partner_enterprise_001",
            "permissions": {"canManageApiKeys": true}
        }))
        .unwrap();

        assert_eq!(user.role, UserRole::PartnerAdmin);
        assert_eq!(user.image.as_deref(), Some("https://example.com/a.png"));
        assert_eq!(user.permissions["canManageApiKeys"], true);
    }
}
