//! Credential record repository

use anyhow::Result;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use taskboard_shared::{Location, PublicUser};
use uuid::Uuid;

/// Credential record from database
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct UserRecord {
    pub id: Uuid,
    pub username: String,
    pub email: String,
    pub name: String,
    pub password_hash: String,
    pub profile_image: String,
    pub bio: Option<String>,
    pub city: Option<String>,
    pub country: Option<String>,
    pub last_login: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl UserRecord {
    /// Public projection; the password hash never leaves this type
    pub fn to_public(&self) -> PublicUser {
        PublicUser {
            id: self.id.to_string(),
            username: self.username.clone(),
            name: self.name.clone(),
            email: self.email.clone(),
            profile_image: self.profile_image.clone(),
            location: Location {
                city: self.city.clone().unwrap_or_default(),
                country: self.country.clone().unwrap_or_default(),
            },
            bio: self.bio.clone().unwrap_or_default(),
        }
    }
}

/// Input for creating a credential record
#[derive(Debug, Clone)]
pub struct NewUser<'a> {
    pub username: &'a str,
    pub email: &'a str,
    pub name: &'a str,
    pub password_hash: &'a str,
    pub profile_image: &'a str,
}

/// Selective profile patch; `None` leaves the column untouched
#[derive(Debug, Clone, Default)]
pub struct ProfileChanges {
    pub name: Option<String>,
    pub username: Option<String>,
    pub bio: Option<String>,
    pub location: Option<Location>,
    pub profile_image: Option<String>,
}

/// Credential record repository
pub struct UserRepository;

impl UserRepository {
    /// Insert a new record; `last_login` starts at creation time
    pub async fn create(pool: &PgPool, user: NewUser<'_>) -> Result<UserRecord> {
        let record = sqlx::query_as::<_, UserRecord>(
            r#"
            INSERT INTO users (username, email, name, password_hash, profile_image, last_login)
            VALUES ($1, $2, $3, $4, $5, NOW())
            RETURNING id, username, email, name, password_hash, profile_image, bio,
                      city, country, last_login, created_at, updated_at
            "#,
        )
        .bind(user.username)
        .bind(user.email)
        .bind(user.name)
        .bind(user.password_hash)
        .bind(user.profile_image)
        .fetch_one(pool)
        .await?;

        Ok(record)
    }

    pub async fn find_by_email(pool: &PgPool, email: &str) -> Result<Option<UserRecord>> {
        let record = sqlx::query_as::<_, UserRecord>(
            r#"
            SELECT id, username, email, name, password_hash, profile_image, bio,
                   city, country, last_login, created_at, updated_at
            FROM users
            WHERE email = $1
            "#,
        )
        .bind(email)
        .fetch_optional(pool)
        .await?;

        Ok(record)
    }

    pub async fn find_by_id(pool: &PgPool, id: Uuid) -> Result<Option<UserRecord>> {
        let record = sqlx::query_as::<_, UserRecord>(
            r#"
            SELECT id, username, email, name, password_hash, profile_image, bio,
                   city, country, last_login, created_at, updated_at
            FROM users
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(pool)
        .await?;

        Ok(record)
    }

    /// Whether a username or email is already registered
    pub async fn identity_exists(pool: &PgPool, username: &str, email: &str) -> Result<bool> {
        let exists = sqlx::query_scalar::<_, bool>(
            r#"
            SELECT EXISTS(SELECT 1 FROM users WHERE username = $1 OR email = $2)
            "#,
        )
        .bind(username)
        .bind(email)
        .fetch_one(pool)
        .await?;

        Ok(exists)
    }

    /// Whether `username` belongs to a record other than `exclude`
    pub async fn username_taken_by_other(
        pool: &PgPool,
        username: &str,
        exclude: Uuid,
    ) -> Result<bool> {
        let taken = sqlx::query_scalar::<_, bool>(
            r#"
            SELECT EXISTS(SELECT 1 FROM users WHERE username = $1 AND id <> $2)
            "#,
        )
        .bind(username)
        .bind(exclude)
        .fetch_one(pool)
        .await?;

        Ok(taken)
    }

    pub async fn touch_last_login(pool: &PgPool, id: Uuid) -> Result<()> {
        sqlx::query("UPDATE users SET last_login = NOW() WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await?;
        Ok(())
    }

    /// Apply a profile patch, returning the updated record
    pub async fn update_profile(
        pool: &PgPool,
        id: Uuid,
        changes: ProfileChanges,
    ) -> Result<Option<UserRecord>> {
        let (city, country) = match changes.location {
            Some(loc) => (Some(loc.city), Some(loc.country)),
            None => (None, None),
        };

        let record = sqlx::query_as::<_, UserRecord>(
            r#"
            UPDATE users SET
                name = COALESCE($2, name),
                username = COALESCE($3, username),
                bio = COALESCE($4, bio),
                city = COALESCE($5, city),
                country = COALESCE($6, country),
                profile_image = COALESCE($7, profile_image),
                updated_at = NOW()
            WHERE id = $1
            RETURNING id, username, email, name, password_hash, profile_image, bio,
                      city, country, last_login, created_at, updated_at
            "#,
        )
        .bind(id)
        .bind(changes.name)
        .bind(changes.username)
        .bind(changes.bio)
        .bind(city)
        .bind(country)
        .bind(changes.profile_image)
        .fetch_optional(pool)
        .await?;

        Ok(record)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record() -> UserRecord {
        UserRecord {
            id: Uuid::new_v4(),
            username: "alice".into(),
            email: "alice@example.com".into(),
            name: "Alice".into(),
            password_hash: "$argon2id$v=19$secret".into(),
            profile_image: "https://ui-avatars.com/api/?name=Alice&background=random".into(),
            bio: None,
            city: Some("Porto".into()),
            country: None,
            last_login: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_public_projection_excludes_secret() {
        let record = record();
        let public = record.to_public();

        assert_eq!(public.id, record.id.to_string());
        assert_eq!(public.location.city, "Porto");
        assert_eq!(public.location.country, "");
        assert_eq!(public.bio, "");

        let json = serde_json::to_string(&public).unwrap();
        assert!(!json.contains("argon2"));
    }
}
