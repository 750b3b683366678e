/// User and profile models and database operations
///
/// Every user has exactly one profile, created in the same transaction as the
/// user row. Users are soft deleted: `deleted_at` is set and every lookup in this
/// module ignores such rows, so a deleted user can no longer log in or refresh.
///
/// # Schema
///
/// ```sql
/// CREATE TYPE user_role AS ENUM ('admin', 'instructor', 'student');
/// CREATE TYPE user_gender AS ENUM ('male', 'female');
///
/// CREATE TABLE users (
///     id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
///     phone VARCHAR(20) NOT NULL,
///     password_hash VARCHAR(255) NOT NULL,
///     role user_role NOT NULL DEFAULT 'student',
///     created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
///     updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
///     deleted_at TIMESTAMPTZ
/// );
/// CREATE UNIQUE INDEX users_phone_key ON users (phone) WHERE deleted_at IS NULL;
///
/// CREATE TABLE profiles (
///     user_id UUID PRIMARY KEY REFERENCES users(id) ON DELETE CASCADE,
///     name VARCHAR(100) NOT NULL,
///     gender user_gender,
///     avatar_url VARCHAR(512)
/// );
/// ```
///
/// # Example
///
/// ```no_run
/// use yogaguru_shared::models::user::{CreateUser, Role, User};
/// use yogaguru_shared::db::pool::{create_pool, DatabaseConfig};
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let pool = create_pool(DatabaseConfig::default()).await?;
///
/// let user = User::create(&pool, CreateUser {
///     phone: "+15551234567".to_string(),
///     password_hash: "$argon2id$...".to_string(),
///     role: Role::Student,
///     name: "Asha".to_string(),
///     gender: None,
/// }).await?;
///
/// let found = User::find_by_phone(&pool, "+15551234567").await?;
/// assert_eq!(found.map(|u| u.id), Some(user.id));
/// # Ok(())
/// # }
/// ```

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use uuid::Uuid;

use super::ParseEnumError;

/// Role of a user account
///
/// Roles are flat capabilities rather than a hierarchy. Admins additionally
/// bypass ownership checks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "user_role", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Manages users, payments and any course
    Admin,

    /// Creates and manages own courses, records attendance
    Instructor,

    /// Enrolls in courses
    Student,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Admin => "admin",
            Role::Instructor => "instructor",
            Role::Student => "student",
        }
    }

    /// Whether a user may pick this role for themselves at registration
    pub fn is_self_assignable(&self) -> bool {
        !matches!(self, Role::Admin)
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "admin" => Ok(Role::Admin),
            "instructor" => Ok(Role::Instructor),
            "student" => Ok(Role::Student),
            other => Err(ParseEnumError::new("role", other)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "user_gender", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum Gender {
    Male,
    Female,
}

impl Gender {
    pub fn as_str(&self) -> &'static str {
        match self {
            Gender::Male => "male",
            Gender::Female => "female",
        }
    }
}

impl FromStr for Gender {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "male" => Ok(Gender::Male),
            "female" => Ok(Gender::Female),
            other => Err(ParseEnumError::new("gender", other)),
        }
    }
}

/// User account
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct User {
    /// Unique user ID (UUID v4)
    pub id: Uuid,

    /// Phone number in E.164 format, unique among live users
    pub phone: String,

    /// Argon2id password hash
    #[serde(skip_serializing)]
    pub password_hash: String,

    pub role: Role,

    pub created_at: DateTime<Utc>,

    pub updated_at: DateTime<Utc>,

    /// Set when an admin removes the account
    #[serde(skip_serializing_if = "Option::is_none")]
    pub deleted_at: Option<DateTime<Utc>>,
}

/// Profile attached 1:1 to a user
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Profile {
    pub user_id: Uuid,
    pub name: String,
    pub gender: Option<Gender>,
    pub avatar_url: Option<String>,
}

/// The caller's own profile as shown by `GET /users/me`
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct ProfileView {
    pub name: String,

    #[serde(rename = "avatarURL")]
    pub avatar_url: Option<String>,

    pub phone: String,

    pub gender: Option<Gender>,
}

/// Input for creating a user together with its profile
#[derive(Debug, Clone)]
pub struct CreateUser {
    pub phone: String,
    pub password_hash: String,
    pub role: Role,
    pub name: String,
    pub gender: Option<Gender>,
}

impl User {
    /// Creates a user and its profile in one transaction
    ///
    /// # Errors
    ///
    /// Returns a unique violation on `users_phone_key` if the phone is taken by a
    /// live user.
    pub async fn create(pool: &PgPool, data: CreateUser) -> Result<Self, sqlx::Error> {
        let mut tx = pool.begin().await?;

        let user = sqlx::query_as::<_, User>(
            r#"
            INSERT INTO users (phone, password_hash, role)
            VALUES ($1, $2, $3)
            RETURNING id, phone, password_hash, role, created_at, updated_at, deleted_at
            "#,
        )
        .bind(&data.phone)
        .bind(&data.password_hash)
        .bind(data.role)
        .fetch_one(&mut *tx)
        .await?;

        sqlx::query("INSERT INTO profiles (user_id, name, gender) VALUES ($1, $2, $3)")
            .bind(user.id)
            .bind(&data.name)
            .bind(data.gender)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;

        tracing::debug!(user_id = %user.id, role = %user.role, "Created user");

        Ok(user)
    }

    /// Finds a live user by ID
    pub async fn find_by_id(pool: &PgPool, id: Uuid) -> Result<Option<Self>, sqlx::Error> {
        let user = sqlx::query_as::<_, User>(
            r#"
            SELECT id, phone, password_hash, role, created_at, updated_at, deleted_at
            FROM users
            WHERE id = $1 AND deleted_at IS NULL
            "#,
        )
        .bind(id)
        .fetch_optional(pool)
        .await?;

        Ok(user)
    }

    /// Finds a live user by phone number
    pub async fn find_by_phone(pool: &PgPool, phone: &str) -> Result<Option<Self>, sqlx::Error> {
        let user = sqlx::query_as::<_, User>(
            r#"
            SELECT id, phone, password_hash, role, created_at, updated_at, deleted_at
            FROM users
            WHERE phone = $1 AND deleted_at IS NULL
            "#,
        )
        .bind(phone)
        .fetch_optional(pool)
        .await?;

        Ok(user)
    }

    /// Changes a live user's role
    ///
    /// Returns `None` if the user does not exist or was deleted.
    pub async fn update_role(
        pool: &PgPool,
        id: Uuid,
        role: Role,
    ) -> Result<Option<Self>, sqlx::Error> {
        let user = sqlx::query_as::<_, User>(
            r#"
            UPDATE users
            SET role = $2, updated_at = NOW()
            WHERE id = $1 AND deleted_at IS NULL
            RETURNING id, phone, password_hash, role, created_at, updated_at, deleted_at
            "#,
        )
        .bind(id)
        .bind(role)
        .fetch_optional(pool)
        .await?;

        Ok(user)
    }

    /// Soft deletes a user
    ///
    /// Returns false if the user does not exist or is already deleted.
    pub async fn soft_delete(pool: &PgPool, id: Uuid) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE users SET deleted_at = NOW(), updated_at = NOW() WHERE id = $1 AND deleted_at IS NULL",
        )
        .bind(id)
        .execute(pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Loads the profile view (name, avatar, phone, gender) of a live user
    pub async fn profile_view(pool: &PgPool, id: Uuid) -> Result<Option<ProfileView>, sqlx::Error> {
        let view = sqlx::query_as::<_, ProfileView>(
            r#"
            SELECT p.name, p.avatar_url, u.phone, p.gender
            FROM users u
            JOIN profiles p ON p.user_id = u.id
            WHERE u.id = $1 AND u.deleted_at IS NULL
            "#,
        )
        .bind(id)
        .fetch_optional(pool)
        .await?;

        Ok(view)
    }
}

impl Profile {
    pub async fn find_by_user_id(pool: &PgPool, user_id: Uuid) -> Result<Option<Self>, sqlx::Error> {
        let profile = sqlx::query_as::<_, Profile>(
            "SELECT user_id, name, gender, avatar_url FROM profiles WHERE user_id = $1",
        )
        .bind(user_id)
        .fetch_optional(pool)
        .await?;

        Ok(profile)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_parse_and_display() {
        for role in [Role::Admin, Role::Instructor, Role::Student] {
            assert_eq!(role.as_str().parse::<Role>().unwrap(), role);
            assert_eq!(role.to_string(), role.as_str());
        }

        let err = "superuser".parse::<Role>().unwrap_err();
        assert_eq!(err.to_string(), "invalid role: superuser");
        assert!("Admin".parse::<Role>().is_err());
    }

    #[test]
    fn test_admin_is_not_self_assignable() {
        assert!(!Role::Admin.is_self_assignable());
        assert!(Role::Instructor.is_self_assignable());
        assert!(Role::Student.is_self_assignable());
    }

    #[test]
    fn test_gender_parse() {
        assert_eq!("male".parse::<Gender>().unwrap(), Gender::Male);
        assert_eq!("female".parse::<Gender>().unwrap(), Gender::Female);
        assert!("other".parse::<Gender>().is_err());
    }

    #[test]
    fn test_role_serde() {
        assert_eq!(serde_json::to_string(&Role::Instructor).unwrap(), "\"instructor\"");
        let role: Role = serde_json::from_str("\"student\"").unwrap();
        assert_eq!(role, Role::Student);
    }

    #[test]
    fn test_user_serialization_hides_password_hash() {
        let user = User {
            id: Uuid::new_v4(),
            phone: "+15551234567".to_string(),
            password_hash: "$argon2id$secret".to_string(),
            role: Role::Student,
            created_at: Utc::now(),
            updated_at: Utc::now(),
            deleted_at: None,
        };

        let json = serde_json::to_value(&user).unwrap();
        assert!(json.get("password_hash").is_none());
        assert!(json.get("deleted_at").is_none());
        assert_eq!(json["role"], "student");
    }

    #[test]
    fn test_profile_view_field_names() {
        let view = ProfileView {
            name: "Asha".to_string(),
            avatar_url: None,
            phone: "+15551234567".to_string(),
            gender: Some(Gender::Female),
        };

        let json = serde_json::to_value(&view).unwrap();
        assert_eq!(json["name"], "Asha");
        assert!(json["avatarURL"].is_null());
        assert_eq!(json["phone"], "+15551234567");
        assert_eq!(json["gender"], "female");
    }

    // Database-backed tests live in tests/models_tests.rs
}
