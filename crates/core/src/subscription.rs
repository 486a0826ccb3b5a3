//! Subscription gating
//!
//! Read-time projections from a user's subscription and trial fields onto
//! view permissions and feature limits, plus the plan changes (upgrade,
//! cancel, admin override) that write those fields.

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;

use crate::error::{Error, Result};
use crate::models::{AccountType, PaymentMethod, Plan, Role, SubscriptionInfo, TrialInfo, User};

/// Length of a purchased plan period
pub const PLAN_DURATION_DAYS: i64 = 30;

/// Price of each center above the plan limit (₮)
pub const EXTRA_CENTER_PRICE: u32 = 19_900;

/// Catalog entry for a purchasable plan
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PlanInfo {
    pub id: Plan,
    pub price: u32,
    pub duration_days: i64,
    pub max_centers: u32,
    /// `None` means unlimited
    pub max_images: Option<u32>,
    pub can_upload_video: bool,
    pub has_marketing_boost: bool,
    pub has_advanced_analytics: bool,
    /// Account type allowed to buy this plan
    pub account_type: AccountType,
}

const NORMAL: PlanInfo = PlanInfo {
    id: Plan::Normal,
    price: 4_990,
    duration_days: PLAN_DURATION_DAYS,
    max_centers: 0,
    max_images: Some(0),
    can_upload_video: false,
    has_marketing_boost: false,
    has_advanced_analytics: false,
    account_type: AccountType::User,
};

const BUSINESS_STANDARD: PlanInfo = PlanInfo {
    id: Plan::BusinessStandard,
    price: 29_900,
    duration_days: PLAN_DURATION_DAYS,
    max_centers: 1,
    max_images: Some(3),
    can_upload_video: false,
    has_marketing_boost: false,
    has_advanced_analytics: false,
    account_type: AccountType::CenterOwner,
};

const BUSINESS_PRO: PlanInfo = PlanInfo {
    id: Plan::BusinessPro,
    price: 59_900,
    duration_days: PLAN_DURATION_DAYS,
    max_centers: 3,
    max_images: None,
    can_upload_video: true,
    has_marketing_boost: true,
    has_advanced_analytics: true,
    account_type: AccountType::CenterOwner,
};

/// All purchasable plans
pub fn plan_catalog() -> &'static [PlanInfo] {
    &[NORMAL, BUSINESS_STANDARD, BUSINESS_PRO]
}

pub fn plan_info(plan: Plan) -> Option<&'static PlanInfo> {
    plan_catalog().iter().find(|p| p.id == plan)
}

/// Why a gated action was refused
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "reason", rename_all = "camelCase")]
pub enum AccessDenial {
    /// No paid plan
    Upgrade,
    /// Paid plan past its end date
    Expired,
    /// Paid plan switched off
    Inactive,
    /// Only center owners may do this
    OwnersOnly,
    /// The feature needs `business_pro`
    Feature { feature: OwnerFeature },
    /// Plan allows no more centers
    CenterLimit { current: u32, max: u32, extra_center_price: u32 },
    /// Plan allows fewer images
    ImageLimit { max: u32 },
}

impl std::fmt::Display for AccessDenial {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AccessDenial::Upgrade => f.write_str("a paid plan is required"),
            AccessDenial::Expired => f.write_str("subscription has expired"),
            AccessDenial::Inactive => f.write_str("subscription is inactive"),
            AccessDenial::OwnersOnly => f.write_str("only center owners may do this"),
            AccessDenial::Feature { feature } => {
                write!(f, "{} requires the business_pro plan", feature.as_str())
            }
            AccessDenial::CenterLimit { max, .. } => {
                write!(f, "plan allows {} center(s)", max)
            }
            AccessDenial::ImageLimit { max } => write!(f, "plan allows {} image(s)", max),
        }
    }
}

/// Owner features gated behind `business_pro`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum OwnerFeature {
    Video,
    Analytics,
    Marketing,
}

impl OwnerFeature {
    pub fn as_str(&self) -> &'static str {
        match self {
            OwnerFeature::Video => "video",
            OwnerFeature::Analytics => "analytics",
            OwnerFeature::Marketing => "marketing",
        }
    }
}

/// Subscription state that counts right now, with trial taking precedence
pub fn entitled_plan(user: &User, now: DateTime<Utc>) -> Plan {
    if user.trial.is_running_at(now) {
        if let Some(plan) = user.trial.plan {
            return plan;
        }
    }
    let sub = &user.subscription;
    if !sub.is_active || sub.is_expired_at(now) {
        return Plan::Free;
    }
    sub.plan
}

/// Plan label shown to the user; an active trial reports `trial`
pub fn display_plan(user: &User, now: DateTime<Utc>) -> Plan {
    if user.trial.is_running_at(now) && user.trial.plan.is_some() {
        Plan::Trial
    } else {
        entitled_plan(user, now)
    }
}

/// Derived view permissions for the current viewer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ViewPermissions {
    pub plan: Plan,
    pub is_premium_user: bool,
    pub can_view_details: bool,
    pub is_admin: bool,
    pub is_owner: bool,
    pub trial_days_remaining: i64,
}

impl ViewPermissions {
    /// Anonymous viewer
    pub fn anonymous() -> Self {
        Self {
            plan: Plan::Free,
            is_premium_user: false,
            can_view_details: false,
            is_admin: false,
            is_owner: false,
            trial_days_remaining: 0,
        }
    }

    pub fn for_user(user: &User, now: DateTime<Utc>) -> Self {
        let is_admin = user.is_admin();
        let is_owner = user.role == Role::CenterOwner;
        let is_premium_user = user.role == Role::User && entitled_plan(user, now).is_paid();
        Self {
            plan: display_plan(user, now),
            is_premium_user,
            can_view_details: is_admin || is_owner || is_premium_user,
            is_admin,
            is_owner,
            trial_days_remaining: user.trial.days_remaining(now),
        }
    }

    pub fn for_viewer(user: Option<&User>, now: DateTime<Utc>) -> Self {
        user.map(|u| Self::for_user(u, now))
            .unwrap_or_else(Self::anonymous)
    }
}

/// Shared paid-plan check for both account kinds
fn check_paid(user: &User, now: DateTime<Utc>) -> std::result::Result<(), AccessDenial> {
    if user.trial.is_running_at(now) {
        return Ok(());
    }
    let sub = &user.subscription;
    if sub.plan == Plan::Free {
        return Err(AccessDenial::Upgrade);
    }
    if sub.is_expired_at(now) {
        return Err(AccessDenial::Expired);
    }
    if !sub.is_active {
        return Err(AccessDenial::Inactive);
    }
    Ok(())
}

/// Gate for user-facing paid features. Admins and owners pass.
pub fn require_paid_plan(user: &User, now: DateTime<Utc>) -> Result<()> {
    if user.is_admin() || user.account_type != AccountType::User {
        return Ok(());
    }
    check_paid(user, now).map_err(Error::Subscription)
}

/// Gate for owner features, optionally requiring a `business_pro` feature
pub fn require_owner_feature(
    user: &User,
    feature: Option<OwnerFeature>,
    now: DateTime<Utc>,
) -> Result<()> {
    if user.is_admin() {
        return Ok(());
    }
    if user.account_type != AccountType::CenterOwner {
        return Err(Error::Subscription(AccessDenial::OwnersOnly));
    }
    check_paid(user, now).map_err(Error::Subscription)?;

    if let Some(feature) = feature {
        let allowed = plan_info(entitled_plan(user, now)).is_some_and(|info| match feature {
            OwnerFeature::Video => info.can_upload_video,
            OwnerFeature::Analytics => info.has_advanced_analytics,
            OwnerFeature::Marketing => info.has_marketing_boost,
        });
        if !allowed {
            return Err(Error::Subscription(AccessDenial::Feature { feature }));
        }
    }
    Ok(())
}

/// Number of centers the entitled plan allows
pub fn max_centers(plan: Plan) -> u32 {
    plan_info(plan).map(|p| p.max_centers).unwrap_or(0)
}

/// Gate for adding another center. Admins are unlimited.
pub fn check_center_limit(user: &User, current_count: u32, now: DateTime<Utc>) -> Result<()> {
    if user.is_admin() {
        return Ok(());
    }
    if user.account_type != AccountType::CenterOwner {
        return Err(Error::Subscription(AccessDenial::OwnersOnly));
    }
    let plan = entitled_plan(user, now);
    if plan == Plan::Free {
        return Err(Error::Subscription(AccessDenial::Upgrade));
    }
    let max = max_centers(plan);
    if current_count >= max {
        return Err(Error::Subscription(AccessDenial::CenterLimit {
            current: current_count,
            max,
            extra_center_price: EXTRA_CENTER_PRICE,
        }));
    }
    Ok(())
}

/// Gate for the number of gallery images on a center. Admins are unlimited.
pub fn check_image_limit(user: &User, image_count: usize, now: DateTime<Utc>) -> Result<()> {
    if user.is_admin() || image_count == 0 {
        return Ok(());
    }
    let max = match plan_info(entitled_plan(user, now)) {
        Some(info) => info.max_images,
        None => Some(0),
    };
    match max {
        Some(max) if image_count > max as usize => {
            Err(Error::Subscription(AccessDenial::ImageLimit { max }))
        }
        _ => Ok(()),
    }
}

/// Apply a purchased plan (mock payment path)
pub fn upgrade(
    user: &mut User,
    plan: Plan,
    method: PaymentMethod,
    now: DateTime<Utc>,
) -> Result<()> {
    let info = plan_info(plan)
        .ok_or_else(|| Error::Validation(format!("unknown plan '{}'", plan)))?;

    if info.account_type != user.account_type {
        return Err(Error::Validation(format!(
            "plan {} is not available for this account type",
            plan
        )));
    }

    let current = &user.subscription;
    if current.plan == plan && current.is_active && !current.is_expired_at(now) {
        return Err(Error::Conflict(format!("plan {} is already active", plan)));
    }

    user.subscription = SubscriptionInfo {
        plan,
        is_active: true,
        start_date: Some(now),
        expires_at: Some(now + Duration::days(info.duration_days)),
        auto_renew: true,
        payment_method: Some(method),
    };
    Ok(())
}

/// Switch off the current subscription and auto-renewal
pub fn cancel(user: &mut User) {
    user.subscription.is_active = false;
    user.subscription.auto_renew = false;
}

/// Longest period an admin can grant at once
pub const MAX_ADMIN_PLAN_DAYS: i64 = 3650;

/// Admin override; `Plan::Trial` starts a trial instead of a paid period
pub fn admin_set_plan(user: &mut User, plan: Plan, duration_days: i64, now: DateTime<Utc>) -> Result<()> {
    if !(1..=MAX_ADMIN_PLAN_DAYS).contains(&duration_days) {
        return Err(Error::Validation(format!(
            "duration must be 1 to {} days",
            MAX_ADMIN_PLAN_DAYS
        )));
    }
    let end = Duration::try_days(duration_days)
        .and_then(|span| now.checked_add_signed(span))
        .ok_or_else(|| Error::Validation("duration is out of range".into()))?;

    if plan == Plan::Trial {
        let trial_plan = match user.account_type {
            AccountType::User => Plan::Normal,
            AccountType::CenterOwner => Plan::BusinessStandard,
        };
        user.trial = TrialInfo {
            plan: Some(trial_plan),
            is_active: true,
            start_date: Some(now),
            end_date: Some(end),
            has_used: true,
        };
        return Ok(());
    }

    user.subscription = SubscriptionInfo {
        plan,
        is_active: true,
        start_date: Some(now),
        expires_at: Some(end),
        auto_renew: false,
        payment_method: Some(PaymentMethod::Admin),
    };
    Ok(())
}
