//! User model

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::Plan;

/// Authorization role
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Role {
    #[default]
    User,
    CenterOwner,
    Admin,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "user",
            Role::CenterOwner => "centerOwner",
            Role::Admin => "admin",
        }
    }

    pub fn from_db(s: &str) -> Role {
        match s {
            "admin" => Role::Admin,
            "centerOwner" => Role::CenterOwner,
            _ => Role::User,
        }
    }
}

/// Kind of account chosen at registration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum AccountType {
    #[default]
    User,
    CenterOwner,
}

impl AccountType {
    pub fn as_str(&self) -> &'static str {
        match self {
            AccountType::User => "user",
            AccountType::CenterOwner => "centerOwner",
        }
    }

    pub fn from_db(s: &str) -> AccountType {
        match s {
            "centerOwner" => AccountType::CenterOwner,
            _ => AccountType::User,
        }
    }
}

/// How a subscription was paid for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PaymentMethod {
    Qpay,
    Mostmoney,
    Card,
    Mock,
    Admin,
}

impl PaymentMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentMethod::Qpay => "qpay",
            PaymentMethod::Mostmoney => "mostmoney",
            PaymentMethod::Card => "card",
            PaymentMethod::Mock => "mock",
            PaymentMethod::Admin => "admin",
        }
    }

    /// Unknown methods fall back to mock
    pub fn parse(s: &str) -> PaymentMethod {
        match s {
            "qpay" => PaymentMethod::Qpay,
            "mostmoney" => PaymentMethod::Mostmoney,
            "card" => PaymentMethod::Card,
            "admin" => PaymentMethod::Admin,
            _ => PaymentMethod::Mock,
        }
    }
}

/// Paid subscription state stored on the user
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubscriptionInfo {
    pub plan: Plan,
    pub is_active: bool,
    pub start_date: Option<DateTime<Utc>>,
    pub expires_at: Option<DateTime<Utc>>,
    pub auto_renew: bool,
    pub payment_method: Option<PaymentMethod>,
}

impl Default for SubscriptionInfo {
    fn default() -> Self {
        Self {
            plan: Plan::Free,
            is_active: true,
            start_date: None,
            expires_at: None,
            auto_renew: true,
            payment_method: None,
        }
    }
}

impl SubscriptionInfo {
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.is_some_and(|end| now > end)
    }
}

/// Trial upgrade state
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrialInfo {
    pub plan: Option<Plan>,
    pub is_active: bool,
    pub start_date: Option<DateTime<Utc>>,
    pub end_date: Option<DateTime<Utc>>,
    pub has_used: bool,
}

impl TrialInfo {
    /// Active and not past its end date
    pub fn is_running_at(&self, now: DateTime<Utc>) -> bool {
        self.is_active && self.end_date.is_some_and(|end| now <= end)
    }

    /// Whole days left, rounded up; zero when not running
    pub fn days_remaining(&self, now: DateTime<Utc>) -> i64 {
        match self.end_date {
            Some(end) if self.is_running_at(now) => {
                let secs = (end - now).num_seconds();
                (secs + 86_399) / 86_400
            }
            _ => 0,
        }
    }
}

/// A registered account
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    #[serde(rename = "_id")]
    pub id: Uuid,
    pub email: String,
    pub username: Option<String>,
    pub full_name: Option<String>,
    pub phone: Option<String>,
    pub avatar: String,
    #[serde(skip_serializing, default)]
    pub password_hash: String,
    pub role: Role,
    pub account_type: AccountType,
    pub center_name: Option<String>,
    pub is_active: bool,
    pub subscription: SubscriptionInfo,
    pub trial: TrialInfo,
    #[serde(rename = "favoritesCenters")]
    pub favorites: Vec<Uuid>,
    pub created_at: DateTime<Utc>,
    pub last_login: Option<DateTime<Utc>>,
}

impl User {
    pub fn new(email: String, password_hash: String, account_type: AccountType) -> Self {
        let role = match account_type {
            AccountType::User => Role::User,
            AccountType::CenterOwner => Role::CenterOwner,
        };
        Self {
            id: Uuid::new_v4(),
            email,
            username: None,
            full_name: None,
            phone: None,
            avatar: String::new(),
            password_hash,
            role,
            account_type,
            center_name: None,
            is_active: true,
            subscription: SubscriptionInfo::default(),
            trial: TrialInfo::default(),
            favorites: Vec::new(),
            created_at: Utc::now(),
            last_login: None,
        }
    }

    pub fn with_username(mut self, username: String) -> Self {
        self.username = Some(username);
        self
    }

    pub fn with_full_name(mut self, full_name: String) -> Self {
        self.full_name = Some(full_name);
        self
    }

    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }

    pub fn is_center_owner(&self) -> bool {
        self.role == Role::CenterOwner || self.account_type == AccountType::CenterOwner
    }

    /// Name shown to center owners: full name, then username, then a placeholder
    pub fn display_name(&self) -> String {
        self.full_name
            .as_deref()
            .filter(|s| !s.trim().is_empty())
            .or(self.username.as_deref().filter(|s| !s.trim().is_empty()))
            .unwrap_or("Guest")
            .to_string()
    }
}

/// Active session for a logged-in user; the id doubles as the bearer token
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    pub id: Uuid,
    pub user_id: Uuid,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl Session {
    pub fn new(user_id: Uuid, duration_hours: i64) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            user_id,
            created_at: now,
            expires_at: now + chrono::Duration::hours(duration_hours),
        }
    }

    pub fn is_valid(&self) -> bool {
        Utc::now() < self.expires_at
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn test_password_hash_not_serialized() {
        let user = User::new("a@b.mn".into(), "secret-hash".into(), AccountType::User);
        let json = serde_json::to_string(&user).unwrap();
        assert!(!json.contains("secret-hash"));
        assert!(json.contains("\"_id\""));
        assert!(json.contains("\"favoritesCenters\""));
    }

    #[test]
    fn test_display_name_fallbacks() {
        let user = User::new("a@b.mn".into(), "h".into(), AccountType::User);
        assert_eq!(user.display_name(), "Guest");

        let user = user.with_username("bat".into());
        assert_eq!(user.display_name(), "bat");

        let user = user.with_full_name("Bat-Erdene".into());
        assert_eq!(user.display_name(), "Bat-Erdene");
    }

    #[test]
    fn test_trial_days_remaining() {
        let now = Utc::now();
        let trial = TrialInfo {
            plan: Some(Plan::Normal),
            is_active: true,
            start_date: Some(now),
            end_date: Some(now + Duration::hours(36)),
            has_used: true,
        };
        assert!(trial.is_running_at(now));
        assert_eq!(trial.days_remaining(now), 2);
        assert_eq!(trial.days_remaining(now + Duration::days(3)), 0);
    }

    #[test]
    fn test_owner_account_gets_owner_role() {
        let owner = User::new("o@b.mn".into(), "h".into(), AccountType::CenterOwner);
        assert_eq!(owner.role, Role::CenterOwner);
        assert!(owner.is_center_owner());
        assert!(!owner.is_admin());
    }
}
