//! Database setup and admin bootstrap

use std::path::Path;
use std::sync::{Arc, Mutex};

use playzone_core::auth::{hash_password, validate_email, validate_password};
use playzone_core::{AccountType, Database, Result, Role, User, UserRepository};

/// Open (or create) the database file, creating its directory first
pub fn open_database(path: &Path) -> Result<Arc<Mutex<Database>>> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }

    let db = Database::open(path)?;
    tracing::info!(path = %path.display(), "Database opened");
    Ok(Arc::new(Mutex::new(db)))
}

/// Ensure the configured admin account exists and holds the admin role.
/// An existing account keeps its password.
pub fn bootstrap_admin(db: &Database, email: &str, password: &str, username: &str) -> Result<User> {
    if let Some(mut user) = db.find_user_by_login(email)? {
        if !user.is_admin() {
            db.users().set_role(user.id, Role::Admin)?;
            user.role = Role::Admin;
            tracing::info!(user_id = %user.id, "Promoted existing account to admin");
        }
        return Ok(user);
    }

    validate_email(email)?;
    validate_password(password)?;

    let mut admin = User::new(
        email.trim().to_lowercase(),
        hash_password(password)?,
        AccountType::User,
    )
    .with_username(username.to_string())
    .with_full_name("Administrator".to_string());
    admin.role = Role::Admin;

    db.create_user(&admin)?;
    tracing::info!(user_id = %admin.id, "Created admin account");
    Ok(admin)
}
