//! Database migration system
//!
//! Tracks schema versions and applies migrations in order.

use rusqlite::Connection;
use tracing::{info, instrument};

use crate::error::Result;

/// A database migration
pub struct Migration {
    /// Version number (must be sequential starting from 1)
    pub version: u32,
    /// Description of what this migration does
    pub description: &'static str,
    /// SQL to run for this migration
    pub sql: &'static str,
}

/// All migrations in order
const MIGRATIONS: &[Migration] = &[
    Migration {
        version: 1,
        description: "Initial schema",
        sql: r#"
            -- Users table; subscription and trial fields are flattened
            CREATE TABLE IF NOT EXISTS users (
                id TEXT PRIMARY KEY,
                email TEXT NOT NULL UNIQUE,
                username TEXT UNIQUE,
                full_name TEXT,
                phone TEXT,
                avatar TEXT NOT NULL DEFAULT '',
                password_hash TEXT NOT NULL,
                role TEXT NOT NULL DEFAULT 'user',
                account_type TEXT NOT NULL DEFAULT 'user',
                center_name TEXT,
                is_active INTEGER NOT NULL DEFAULT 1,
                sub_plan TEXT NOT NULL DEFAULT 'free',
                sub_active INTEGER NOT NULL DEFAULT 1,
                sub_start TEXT,
                sub_expires TEXT,
                sub_auto_renew INTEGER NOT NULL DEFAULT 1,
                sub_payment_method TEXT,
                trial_plan TEXT,
                trial_active INTEGER NOT NULL DEFAULT 0,
                trial_start TEXT,
                trial_end TEXT,
                trial_used INTEGER NOT NULL DEFAULT 0,
                created_at TEXT NOT NULL,
                last_login TEXT
            );

            -- Sessions table
            CREATE TABLE IF NOT EXISTS sessions (
                id TEXT PRIMARY KEY,
                user_id TEXT NOT NULL,
                created_at TEXT NOT NULL,
                expires_at TEXT NOT NULL,
                FOREIGN KEY (user_id) REFERENCES users(id) ON DELETE CASCADE
            );

            CREATE INDEX IF NOT EXISTS idx_users_phone ON users(phone);
            CREATE INDEX IF NOT EXISTS idx_sessions_user ON sessions(user_id);
        "#,
    },
    Migration {
        version: 2,
        description: "Add centers and favorites",
        sql: r#"
            -- Nested center fields are stored as JSON text
            CREATE TABLE IF NOT EXISTS centers (
                id TEXT PRIMARY KEY,
                name TEXT NOT NULL,
                category TEXT,
                address TEXT,
                description TEXT,
                phone TEXT,
                email TEXT,
                website TEXT,
                opening TEXT,
                price TEXT,
                logo TEXT,
                rating REAL,
                images TEXT NOT NULL DEFAULT '[]',
                facilities TEXT NOT NULL DEFAULT '[]',
                pricing TEXT NOT NULL DEFAULT '{}',
                occupancy TEXT NOT NULL DEFAULT '{}',
                seats TEXT NOT NULL DEFAULT '{}',
                bonus TEXT NOT NULL DEFAULT '[]',
                owner_id TEXT,
                lat REAL,
                lng REAL,
                created_at TEXT NOT NULL,
                FOREIGN KEY (owner_id) REFERENCES users(id) ON DELETE SET NULL
            );

            CREATE TABLE IF NOT EXISTS user_favorites (
                user_id TEXT NOT NULL,
                center_id TEXT NOT NULL,
                added_at TEXT NOT NULL,
                PRIMARY KEY (user_id, center_id),
                FOREIGN KEY (user_id) REFERENCES users(id) ON DELETE CASCADE,
                FOREIGN KEY (center_id) REFERENCES centers(id) ON DELETE CASCADE
            );

            CREATE INDEX IF NOT EXISTS idx_centers_owner ON centers(owner_id);
        "#,
    },
    Migration {
        version: 3,
        description: "Add bookings",
        sql: r#"
            CREATE TABLE IF NOT EXISTS bookings (
                id TEXT PRIMARY KEY,
                user_id TEXT NOT NULL,
                center_id TEXT NOT NULL,
                date TEXT NOT NULL,
                time TEXT NOT NULL,
                duration INTEGER NOT NULL DEFAULT 1,
                seat_type TEXT NOT NULL DEFAULT 'standard',
                seats INTEGER NOT NULL DEFAULT 1,
                price INTEGER NOT NULL DEFAULT 0,
                status TEXT NOT NULL DEFAULT 'pending',
                created_at TEXT NOT NULL,
                FOREIGN KEY (user_id) REFERENCES users(id) ON DELETE CASCADE,
                FOREIGN KEY (center_id) REFERENCES centers(id) ON DELETE CASCADE
            );

            -- Capacity checks look up one center and day
            CREATE INDEX IF NOT EXISTS idx_bookings_center_date
                ON bookings(center_id, date, seat_type);
            CREATE INDEX IF NOT EXISTS idx_bookings_user_created
                ON bookings(user_id, created_at DESC);
            CREATE INDEX IF NOT EXISTS idx_bookings_created
                ON bookings(created_at);
        "#,
    },
    Migration {
        version: 4,
        description: "Add password reset requests",
        sql: r#"
            CREATE TABLE IF NOT EXISTS password_resets (
                id TEXT PRIMARY KEY,
                phone TEXT NOT NULL,
                code TEXT NOT NULL,
                user_id TEXT NOT NULL,
                is_used INTEGER NOT NULL DEFAULT 0,
                reset_token TEXT UNIQUE,
                reset_token_expiry TEXT,
                expires_at TEXT NOT NULL,
                created_at TEXT NOT NULL,
                FOREIGN KEY (user_id) REFERENCES users(id) ON DELETE CASCADE
            );

            CREATE INDEX IF NOT EXISTS idx_password_resets_phone
                ON password_resets(phone, is_used);
        "#,
    },
    Migration {
        version: 5,
        description: "Add center videos",
        sql: r#"
            ALTER TABLE centers ADD COLUMN videos TEXT NOT NULL DEFAULT '[]';
        "#,
    },
];

/// Initialize the migrations table
fn init_migrations_table(conn: &Connection) -> Result<()> {
    conn.execute(
        "CREATE TABLE IF NOT EXISTS schema_migrations (
            version INTEGER PRIMARY KEY,
            description TEXT NOT NULL,
            applied_at TEXT NOT NULL
        )",
        [],
    )?;
    Ok(())
}

/// Get the current schema version
fn get_current_version(conn: &Connection) -> Result<u32> {
    let version: Option<u32> = conn
        .query_row("SELECT MAX(version) FROM schema_migrations", [], |row| {
            row.get(0)
        })
        .unwrap_or(None);
    Ok(version.unwrap_or(0))
}

/// Record that a migration was applied
fn record_migration(conn: &Connection, migration: &Migration) -> Result<()> {
    conn.execute(
        "INSERT INTO schema_migrations (version, description, applied_at) VALUES (?1, ?2, ?3)",
        rusqlite::params![
            migration.version,
            migration.description,
            chrono::Utc::now().to_rfc3339()
        ],
    )?;
    Ok(())
}

/// Run all pending migrations
#[instrument(skip(conn))]
pub fn run_migrations(conn: &Connection) -> Result<()> {
    init_migrations_table(conn)?;

    let current_version = get_current_version(conn)?;
    info!(current_version, "Checking for pending migrations");

    for migration in MIGRATIONS {
        if migration.version > current_version {
            info!(
                version = migration.version,
                description = migration.description,
                "Applying migration"
            );

            conn.execute_batch(migration.sql)?;
            record_migration(conn, migration)?;

            info!(version = migration.version, "Migration complete");
        }
    }

    let new_version = get_current_version(conn)?;
    if new_version > current_version {
        info!(
            from = current_version,
            to = new_version,
            "Database schema updated"
        );
    }

    Ok(())
}
