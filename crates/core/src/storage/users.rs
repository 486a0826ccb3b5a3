//! User storage operations

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, Row};
use tracing::instrument;
use uuid::Uuid;

use super::parse::{parse_datetime, parse_datetime_opt, parse_uuid, OptionalExt};
use crate::error::Result;
use crate::invariants::assert_user_invariants;
use crate::models::{
    AccountType, PaymentMethod, Plan, Role, Session, SubscriptionInfo, TrialInfo, User,
};

const USER_COLUMNS: &str = "id, email, username, full_name, phone, avatar, password_hash, role, \
     account_type, center_name, is_active, sub_plan, sub_active, sub_start, sub_expires, \
     sub_auto_renew, sub_payment_method, trial_plan, trial_active, trial_start, trial_end, \
     trial_used, created_at, last_login";

fn user_from_row(row: &Row<'_>) -> rusqlite::Result<User> {
    Ok(User {
        id: parse_uuid(&row.get::<_, String>(0)?)?,
        email: row.get(1)?,
        username: row.get(2)?,
        full_name: row.get(3)?,
        phone: row.get(4)?,
        avatar: row.get(5)?,
        password_hash: row.get(6)?,
        role: Role::from_db(&row.get::<_, String>(7)?),
        account_type: AccountType::from_db(&row.get::<_, String>(8)?),
        center_name: row.get(9)?,
        is_active: row.get(10)?,
        subscription: SubscriptionInfo {
            plan: Plan::parse_or_free(&row.get::<_, String>(11)?),
            is_active: row.get(12)?,
            start_date: parse_datetime_opt(row.get(13)?)?,
            expires_at: parse_datetime_opt(row.get(14)?)?,
            auto_renew: row.get(15)?,
            payment_method: row
                .get::<_, Option<String>>(16)?
                .map(|m| PaymentMethod::parse(&m)),
        },
        trial: TrialInfo {
            plan: row.get::<_, Option<String>>(17)?.and_then(|p| Plan::parse(&p)),
            is_active: row.get(18)?,
            start_date: parse_datetime_opt(row.get(19)?)?,
            end_date: parse_datetime_opt(row.get(20)?)?,
            has_used: row.get(21)?,
        },
        favorites: Vec::new(),
        created_at: parse_datetime(&row.get::<_, String>(22)?)?,
        last_login: parse_datetime_opt(row.get(23)?)?,
    })
}

pub struct UserStore<'a> {
    conn: &'a Connection,
}

impl<'a> UserStore<'a> {
    pub fn new(conn: &'a Connection) -> Self {
        Self { conn }
    }

    /// Create a new user
    #[instrument(skip(self, user), fields(email = %user.email))]
    pub fn create(&self, user: &User) -> Result<()> {
        assert_user_invariants(user);
        let sub = &user.subscription;
        let trial = &user.trial;
        self.conn.execute(
            &format!(
                "INSERT INTO users ({USER_COLUMNS}) VALUES \
                 (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16, ?17, \
                 ?18, ?19, ?20, ?21, ?22, ?23, ?24)"
            ),
            params![
                user.id.to_string(),
                user.email,
                user.username,
                user.full_name,
                user.phone,
                user.avatar,
                user.password_hash,
                user.role.as_str(),
                user.account_type.as_str(),
                user.center_name,
                user.is_active,
                sub.plan.as_str(),
                sub.is_active,
                sub.start_date.map(|t| t.to_rfc3339()),
                sub.expires_at.map(|t| t.to_rfc3339()),
                sub.auto_renew,
                sub.payment_method.map(|m| m.as_str()),
                trial.plan.map(|p| p.as_str()),
                trial.is_active,
                trial.start_date.map(|t| t.to_rfc3339()),
                trial.end_date.map(|t| t.to_rfc3339()),
                trial.has_used,
                user.created_at.to_rfc3339(),
                user.last_login.map(|t| t.to_rfc3339()),
            ],
        )?;
        Ok(())
    }

    fn find_where(&self, clause: &str, value: &str) -> Result<Option<User>> {
        let mut stmt = self
            .conn
            .prepare(&format!("SELECT {USER_COLUMNS} FROM users WHERE {clause}"))?;
        let user = stmt.query_row(params![value], user_from_row).optional()?;
        match user {
            Some(mut user) => {
                user.favorites = self.list_favorites(user.id)?;
                Ok(Some(user))
            }
            None => Ok(None),
        }
    }

    /// Find user by ID
    #[instrument(skip(self))]
    pub fn find_by_id(&self, id: Uuid) -> Result<Option<User>> {
        self.find_where("id = ?1", &id.to_string())
    }

    /// Find user by email, case-insensitively
    #[instrument(skip(self))]
    pub fn find_by_email(&self, email: &str) -> Result<Option<User>> {
        self.find_where("lower(email) = lower(?1)", email.trim())
    }

    /// Find user by username
    #[instrument(skip(self))]
    pub fn find_by_username(&self, username: &str) -> Result<Option<User>> {
        self.find_where("username = ?1", username.trim())
    }

    /// Find user by phone number
    #[instrument(skip(self))]
    pub fn find_by_phone(&self, phone: &str) -> Result<Option<User>> {
        self.find_where("phone = ?1", phone.trim())
    }

    /// Find user by email or username, whichever the identifier looks like
    pub fn find_by_login(&self, identifier: &str) -> Result<Option<User>> {
        if identifier.contains('@') {
            self.find_by_email(identifier)
        } else {
            self.find_by_username(identifier)
        }
    }

    /// All users, newest first
    #[instrument(skip(self))]
    pub fn list(&self) -> Result<Vec<User>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {USER_COLUMNS} FROM users ORDER BY created_at DESC"
        ))?;
        let users = stmt
            .query_map([], user_from_row)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(users)
    }

    /// Update editable profile fields
    #[instrument(skip(self, user), fields(user_id = %user.id))]
    pub fn update_profile(&self, user: &User) -> Result<()> {
        self.conn.execute(
            "UPDATE users SET username = ?1, full_name = ?2, phone = ?3, avatar = ?4, center_name = ?5
             WHERE id = ?6",
            params![
                user.username,
                user.full_name,
                user.phone,
                user.avatar,
                user.center_name,
                user.id.to_string(),
            ],
        )?;
        Ok(())
    }

    pub fn update_password(&self, user_id: Uuid, password_hash: &str) -> Result<()> {
        self.conn.execute(
            "UPDATE users SET password_hash = ?1 WHERE id = ?2",
            params![password_hash, user_id.to_string()],
        )?;
        Ok(())
    }

    pub fn set_role(&self, user_id: Uuid, role: Role) -> Result<()> {
        self.conn.execute(
            "UPDATE users SET role = ?1 WHERE id = ?2",
            params![role.as_str(), user_id.to_string()],
        )?;
        Ok(())
    }

    /// Persist subscription and trial state
    #[instrument(skip(self, user), fields(user_id = %user.id, plan = %user.subscription.plan))]
    pub fn save_plan(&self, user: &User) -> Result<()> {
        assert_user_invariants(user);
        let sub = &user.subscription;
        let trial = &user.trial;
        self.conn.execute(
            "UPDATE users SET sub_plan = ?1, sub_active = ?2, sub_start = ?3, sub_expires = ?4,
                sub_auto_renew = ?5, sub_payment_method = ?6, trial_plan = ?7, trial_active = ?8,
                trial_start = ?9, trial_end = ?10, trial_used = ?11
             WHERE id = ?12",
            params![
                sub.plan.as_str(),
                sub.is_active,
                sub.start_date.map(|t| t.to_rfc3339()),
                sub.expires_at.map(|t| t.to_rfc3339()),
                sub.auto_renew,
                sub.payment_method.map(|m| m.as_str()),
                trial.plan.map(|p| p.as_str()),
                trial.is_active,
                trial.start_date.map(|t| t.to_rfc3339()),
                trial.end_date.map(|t| t.to_rfc3339()),
                trial.has_used,
                user.id.to_string(),
            ],
        )?;
        Ok(())
    }

    /// Switch off trials whose end date has passed
    pub fn expire_trials(&self, now: DateTime<Utc>) -> Result<u64> {
        let count = self.conn.execute(
            "UPDATE users SET trial_active = 0 WHERE trial_active = 1 AND trial_end < ?1",
            params![now.to_rfc3339()],
        )?;
        Ok(count as u64)
    }

    /// Update last login time
    pub fn update_last_login(&self, user_id: Uuid) -> Result<()> {
        self.conn.execute(
            "UPDATE users SET last_login = ?1 WHERE id = ?2",
            params![Utc::now().to_rfc3339(), user_id.to_string()],
        )?;
        Ok(())
    }

    /// Favorite center ids, oldest first
    pub fn list_favorites(&self, user_id: Uuid) -> Result<Vec<Uuid>> {
        let mut stmt = self.conn.prepare(
            "SELECT center_id FROM user_favorites WHERE user_id = ?1 ORDER BY added_at, center_id",
        )?;
        let ids = stmt
            .query_map(params![user_id.to_string()], |row| {
                parse_uuid(&row.get::<_, String>(0)?)
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(ids)
    }

    pub fn add_favorite(&self, user_id: Uuid, center_id: Uuid) -> Result<()> {
        self.conn.execute(
            "INSERT OR IGNORE INTO user_favorites (user_id, center_id, added_at) VALUES (?1, ?2, ?3)",
            params![
                user_id.to_string(),
                center_id.to_string(),
                Utc::now().to_rfc3339()
            ],
        )?;
        Ok(())
    }

    /// Returns true if a favorite was removed
    pub fn remove_favorite(&self, user_id: Uuid, center_id: Uuid) -> Result<bool> {
        let count = self.conn.execute(
            "DELETE FROM user_favorites WHERE user_id = ?1 AND center_id = ?2",
            params![user_id.to_string(), center_id.to_string()],
        )?;
        Ok(count > 0)
    }

    /// Add or remove a favorite; returns whether the center is now a favorite
    #[instrument(skip(self))]
    pub fn toggle_favorite(&self, user_id: Uuid, center_id: Uuid) -> Result<bool> {
        if self.remove_favorite(user_id, center_id)? {
            Ok(false)
        } else {
            self.add_favorite(user_id, center_id)?;
            Ok(true)
        }
    }

    /// Create a session
    #[instrument(skip(self, session), fields(user_id = %session.user_id))]
    pub fn create_session(&self, session: &Session) -> Result<()> {
        self.conn.execute(
            "INSERT INTO sessions (id, user_id, created_at, expires_at) VALUES (?1, ?2, ?3, ?4)",
            params![
                session.id.to_string(),
                session.user_id.to_string(),
                session.created_at.to_rfc3339(),
                session.expires_at.to_rfc3339(),
            ],
        )?;
        Ok(())
    }

    /// Find valid session
    #[instrument(skip(self))]
    pub fn find_valid_session(&self, session_id: Uuid) -> Result<Option<Session>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, user_id, created_at, expires_at FROM sessions WHERE id = ?1 AND expires_at > ?2",
        )?;

        let now = Utc::now().to_rfc3339();
        let session = stmt
            .query_row(params![session_id.to_string(), now], |row| {
                Ok(Session {
                    id: parse_uuid(&row.get::<_, String>(0)?)?,
                    user_id: parse_uuid(&row.get::<_, String>(1)?)?,
                    created_at: parse_datetime(&row.get::<_, String>(2)?)?,
                    expires_at: parse_datetime(&row.get::<_, String>(3)?)?,
                })
            })
            .optional()?;

        Ok(session)
    }

    /// Delete session
    pub fn delete_session(&self, session_id: Uuid) -> Result<()> {
        self.conn.execute(
            "DELETE FROM sessions WHERE id = ?1",
            params![session_id.to_string()],
        )?;
        Ok(())
    }

    /// Delete all sessions for user
    pub fn delete_user_sessions(&self, user_id: Uuid) -> Result<()> {
        self.conn.execute(
            "DELETE FROM sessions WHERE user_id = ?1",
            params![user_id.to_string()],
        )?;
        Ok(())
    }

    /// Clean up expired sessions
    pub fn cleanup_expired_sessions(&self) -> Result<u64> {
        let count = self.conn.execute(
            "DELETE FROM sessions WHERE expires_at < ?1",
            params![Utc::now().to_rfc3339()],
        )?;
        Ok(count as u64)
    }
}

#[cfg(test)]
mod tests {
    use crate::models::{AccountType, Center, Plan, Session, User};
    use crate::storage::Database;
    use chrono::{Duration, Utc};

    fn sample_user(email: &str) -> User {
        User::new(email.into(), "hash".into(), AccountType::User).with_username(
            email.split('@').next().unwrap_or("user").to_string(),
        )
    }

    #[test]
    fn test_create_and_find() {
        let db = Database::open_in_memory().unwrap();
        let user = sample_user("bat@pz.mn");
        db.users().create(&user).unwrap();

        let found = db.users().find_by_email("BAT@pz.mn").unwrap().unwrap();
        assert_eq!(found.id, user.id);
        assert_eq!(found.password_hash, "hash");
        assert_eq!(found.subscription.plan, Plan::Free);

        let by_login = db.users().find_by_login("bat").unwrap().unwrap();
        assert_eq!(by_login.id, user.id);
        assert!(db.users().find_by_login("nobody@pz.mn").unwrap().is_none());
    }

    #[test]
    fn test_duplicate_email_rejected() {
        let db = Database::open_in_memory().unwrap();
        db.users().create(&sample_user("a@pz.mn")).unwrap();
        let dup = User::new("a@pz.mn".into(), "hash".into(), AccountType::User);
        assert!(db.users().create(&dup).is_err());
    }

    #[test]
    fn test_save_plan_round_trip() {
        let db = Database::open_in_memory().unwrap();
        let mut user = sample_user("p@pz.mn");
        db.users().create(&user).unwrap();

        let now = Utc::now();
        crate::subscription::admin_set_plan(&mut user, Plan::Normal, 10, now).unwrap();
        db.users().save_plan(&user).unwrap();

        let loaded = db.users().find_by_id(user.id).unwrap().unwrap();
        assert_eq!(loaded.subscription.plan, Plan::Normal);
        assert!(loaded.subscription.expires_at.is_some());
        assert!(!loaded.subscription.auto_renew);
    }

    #[test]
    fn test_expire_trials() {
        let db = Database::open_in_memory().unwrap();
        let mut user = sample_user("t@pz.mn");
        db.users().create(&user).unwrap();

        let started = Utc::now() - Duration::days(10);
        crate::subscription::admin_set_plan(&mut user, Plan::Trial, 3, started).unwrap();
        db.users().save_plan(&user).unwrap();

        assert_eq!(db.users().expire_trials(Utc::now()).unwrap(), 1);
        let loaded = db.users().find_by_id(user.id).unwrap().unwrap();
        assert!(!loaded.trial.is_active);
        assert!(loaded.trial.has_used);
    }

    #[test]
    fn test_toggle_favorite() {
        let db = Database::open_in_memory().unwrap();
        let user = sample_user("f@pz.mn");
        db.users().create(&user).unwrap();
        let center = Center::new("Arena".into());
        db.centers().create(&center).unwrap();

        assert!(db.users().toggle_favorite(user.id, center.id).unwrap());
        assert_eq!(db.users().list_favorites(user.id).unwrap(), vec![center.id]);
        assert!(!db.users().toggle_favorite(user.id, center.id).unwrap());
        assert!(db.users().list_favorites(user.id).unwrap().is_empty());
    }

    #[test]
    fn test_session_lifecycle() {
        let db = Database::open_in_memory().unwrap();
        let user = sample_user("s@pz.mn");
        db.users().create(&user).unwrap();

        let session = Session::new(user.id, 1);
        db.users().create_session(&session).unwrap();
        assert!(db.users().find_valid_session(session.id).unwrap().is_some());

        let expired = Session::new(user.id, -1);
        db.users().create_session(&expired).unwrap();
        assert!(db.users().find_valid_session(expired.id).unwrap().is_none());
        assert_eq!(db.users().cleanup_expired_sessions().unwrap(), 1);

        db.users().delete_session(session.id).unwrap();
        assert!(db.users().find_valid_session(session.id).unwrap().is_none());
    }
}
