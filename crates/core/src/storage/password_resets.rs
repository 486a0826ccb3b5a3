//! Password reset request storage

use chrono::{DateTime, Duration, Utc};
use rusqlite::{params, Connection, Row};
use tracing::instrument;
use uuid::Uuid;

use super::parse::{parse_datetime, parse_datetime_opt, parse_uuid, OptionalExt};
use crate::error::Result;
use crate::models::{PasswordReset, RESET_TOKEN_TTL_MINUTES};

const RESET_COLUMNS: &str = "id, phone, code, user_id, is_used, reset_token, reset_token_expiry, \
     expires_at, created_at";

fn reset_from_row(row: &Row<'_>) -> rusqlite::Result<PasswordReset> {
    Ok(PasswordReset {
        id: parse_uuid(&row.get::<_, String>(0)?)?,
        phone: row.get(1)?,
        code: row.get(2)?,
        user_id: parse_uuid(&row.get::<_, String>(3)?)?,
        is_used: row.get(4)?,
        reset_token: row.get(5)?,
        reset_token_expiry: parse_datetime_opt(row.get(6)?)?,
        expires_at: parse_datetime(&row.get::<_, String>(7)?)?,
        created_at: parse_datetime(&row.get::<_, String>(8)?)?,
    })
}

pub struct PasswordResetStore<'a> {
    conn: &'a Connection,
}

impl<'a> PasswordResetStore<'a> {
    pub fn new(conn: &'a Connection) -> Self {
        Self { conn }
    }

    /// Store a new request, invalidating earlier unused codes for the phone
    #[instrument(skip(self, reset), fields(user_id = %reset.user_id))]
    pub fn create(&self, reset: &PasswordReset) -> Result<()> {
        self.conn.execute(
            "UPDATE password_resets SET is_used = 1 WHERE phone = ?1 AND is_used = 0",
            params![reset.phone],
        )?;
        self.conn.execute(
            &format!("INSERT INTO password_resets ({RESET_COLUMNS}) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)"),
            params![
                reset.id.to_string(),
                reset.phone,
                reset.code,
                reset.user_id.to_string(),
                reset.is_used,
                reset.reset_token,
                reset.reset_token_expiry.map(|t| t.to_rfc3339()),
                reset.expires_at.to_rfc3339(),
                reset.created_at.to_rfc3339(),
            ],
        )?;
        Ok(())
    }

    /// Latest unused, unexpired request matching phone and code
    #[instrument(skip(self, code))]
    pub fn find_valid_code(&self, phone: &str, code: &str) -> Result<Option<PasswordReset>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {RESET_COLUMNS} FROM password_resets
             WHERE phone = ?1 AND code = ?2 AND is_used = 0 AND expires_at > ?3
             ORDER BY created_at DESC LIMIT 1"
        ))?;
        let reset = stmt
            .query_row(
                params![phone, code, Utc::now().to_rfc3339()],
                reset_from_row,
            )
            .optional()?;
        Ok(reset)
    }

    /// Attach a reset token valid for a few minutes
    pub fn issue_token(&self, reset_id: Uuid, token: &str, now: DateTime<Utc>) -> Result<DateTime<Utc>> {
        let expiry = now + Duration::minutes(RESET_TOKEN_TTL_MINUTES);
        self.conn.execute(
            "UPDATE password_resets SET reset_token = ?1, reset_token_expiry = ?2 WHERE id = ?3",
            params![token, expiry.to_rfc3339(), reset_id.to_string()],
        )?;
        Ok(expiry)
    }

    /// Unused request holding `token` whose token has not expired
    #[instrument(skip(self, token))]
    pub fn find_valid_token(&self, token: &str) -> Result<Option<PasswordReset>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {RESET_COLUMNS} FROM password_resets
             WHERE reset_token = ?1 AND is_used = 0 AND reset_token_expiry > ?2"
        ))?;
        let reset = stmt
            .query_row(params![token, Utc::now().to_rfc3339()], reset_from_row)
            .optional()?;
        Ok(reset)
    }

    pub fn mark_used(&self, reset_id: Uuid) -> Result<()> {
        self.conn.execute(
            "UPDATE password_resets SET is_used = 1 WHERE id = ?1",
            params![reset_id.to_string()],
        )?;
        Ok(())
    }

    /// Drop requests that are used or past both expiries
    pub fn cleanup_expired(&self, now: DateTime<Utc>) -> Result<u64> {
        let now = now.to_rfc3339();
        let count = self.conn.execute(
            "DELETE FROM password_resets
             WHERE is_used = 1
                OR (expires_at < ?1 AND (reset_token_expiry IS NULL OR reset_token_expiry < ?1))",
            params![now],
        )?;
        Ok(count as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{AccountType, User};
    use crate::storage::Database;

    fn setup() -> (Database, User) {
        let db = Database::open_in_memory().unwrap();
        let mut user = User::new("r@pz.mn".into(), "hash".into(), AccountType::User);
        user.phone = Some("99112233".into());
        db.users().create(&user).unwrap();
        (db, user)
    }

    #[test]
    fn test_code_then_token_flow() {
        let (db, user) = setup();
        let reset = PasswordReset::new("99112233".into(), "123456".into(), user.id);
        db.password_resets().create(&reset).unwrap();

        assert!(db.password_resets().find_valid_code("99112233", "000000").unwrap().is_none());
        let found = db
            .password_resets()
            .find_valid_code("99112233", "123456")
            .unwrap()
            .unwrap();

        db.password_resets().issue_token(found.id, "tok", Utc::now()).unwrap();
        let by_token = db.password_resets().find_valid_token("tok").unwrap().unwrap();
        assert_eq!(by_token.user_id, user.id);
        assert!(by_token.token_is_valid());

        db.password_resets().mark_used(by_token.id).unwrap();
        assert!(db.password_resets().find_valid_token("tok").unwrap().is_none());
    }

    #[test]
    fn test_new_code_invalidates_previous() {
        let (db, user) = setup();
        db.password_resets()
            .create(&PasswordReset::new("99112233".into(), "111111".into(), user.id))
            .unwrap();
        db.password_resets()
            .create(&PasswordReset::new("99112233".into(), "222222".into(), user.id))
            .unwrap();

        assert!(db.password_resets().find_valid_code("99112233", "111111").unwrap().is_none());
        assert!(db.password_resets().find_valid_code("99112233", "222222").unwrap().is_some());
    }

    #[test]
    fn test_expired_token_rejected() {
        let (db, user) = setup();
        let reset = PasswordReset::new("99112233".into(), "333333".into(), user.id);
        db.password_resets().create(&reset).unwrap();
        db.password_resets()
            .issue_token(reset.id, "old", Utc::now() - Duration::minutes(10))
            .unwrap();
        assert!(db.password_resets().find_valid_token("old").unwrap().is_none());
    }

    #[test]
    fn test_cleanup_removes_used() {
        let (db, user) = setup();
        db.password_resets()
            .create(&PasswordReset::new("99112233".into(), "111111".into(), user.id))
            .unwrap();
        db.password_resets()
            .create(&PasswordReset::new("99112233".into(), "222222".into(), user.id))
            .unwrap();
        assert_eq!(db.password_resets().cleanup_expired(Utc::now()).unwrap(), 1);
    }
}
