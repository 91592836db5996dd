//! Profile service - selective profile patches and avatar replacement

use crate::db::is_unique_violation;
use crate::error::ApiError;
use crate::repositories::{ProfileChanges, UserRepository};
use crate::uploads::{AvatarStore, StoredAvatar};
use sqlx::PgPool;
use taskboard_shared::validation::{validate_bio, validate_name, validate_username};
use taskboard_shared::{parse_location, FieldErrors, PublicUser};
use tracing::info;
use uuid::Uuid;

const USERNAME_TAKEN: &str = "Username is already taken";

/// Text fields of a profile update form. Empty values count as absent.
#[derive(Debug, Clone, Default)]
pub struct ProfileForm {
    pub name: Option<String>,
    pub username: Option<String>,
    pub bio: Option<String>,
    /// Raw `location` field: a JSON object, possibly encoded as a string
    pub location: Option<String>,
}

impl ProfileForm {
    /// Validate and convert into a repository patch
    pub fn into_changes(self) -> Result<ProfileChanges, ApiError> {
        let name = non_empty(self.name);
        let username = non_empty(self.username);
        let bio = non_empty(self.bio);

        let mut errors = FieldErrors::new();
        if let Some(name) = &name {
            errors.check("name", validate_name(name));
        }
        if let Some(username) = &username {
            errors.check("username", validate_username(username));
        }
        if let Some(bio) = &bio {
            errors.check("bio", validate_bio(bio));
        }

        let location = match non_empty(self.location) {
            Some(raw) => match parse_location(&raw) {
                Ok(location) => Some(location),
                Err(location_errors) => {
                    for error in location_errors {
                        errors.push(error);
                    }
                    None
                }
            },
            None => None,
        };
        errors.into_result()?;

        Ok(ProfileChanges {
            name,
            username,
            bio,
            location,
            profile_image: None,
        })
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Profile service for user profile operations
pub struct ProfileService;

impl ProfileService {
    pub async fn get_profile(db: &PgPool, user_id: Uuid) -> Result<PublicUser, ApiError> {
        let user = UserRepository::find_by_id(db, user_id)
            .await
            .map_err(ApiError::Internal)?
            .ok_or_else(|| ApiError::NotFound("User not found".to_string()))?;
        Ok(user.to_public())
    }

    /// Apply a profile update.
    ///
    /// A freshly stored avatar is discarded if the update fails. The previous
    /// avatar is removed only after the new reference is committed.
    pub async fn update_profile(
        db: &PgPool,
        avatars: &AvatarStore,
        user_id: Uuid,
        form: ProfileForm,
        new_avatar: Option<StoredAvatar>,
    ) -> Result<PublicUser, ApiError> {
        let result = Self::apply(db, user_id, form, new_avatar.as_ref()).await;

        match result {
            Ok((user, previous_avatar)) => {
                if let Some(previous) = previous_avatar {
                    if previous != user.profile_image {
                        avatars.remove_reference(&previous).await;
                    }
                }
                info!(%user_id, "Updated profile");
                Ok(user)
            }
            Err(err) => {
                if let Some(avatar) = &new_avatar {
                    avatars.discard(avatar).await;
                }
                Err(err)
            }
        }
    }

    async fn apply(
        db: &PgPool,
        user_id: Uuid,
        form: ProfileForm,
        new_avatar: Option<&StoredAvatar>,
    ) -> Result<(PublicUser, Option<String>), ApiError> {
        let mut changes = form.into_changes()?;

        let current = UserRepository::find_by_id(db, user_id)
            .await
            .map_err(ApiError::Internal)?
            .ok_or_else(|| ApiError::NotFound("User not found".to_string()))?;

        if let Some(username) = &changes.username {
            if *username != current.username
                && UserRepository::username_taken_by_other(db, username, user_id)
                    .await
                    .map_err(ApiError::Internal)?
            {
                return Err(ApiError::DuplicateIdentity(USERNAME_TAKEN.to_string()));
            }
        }

        let previous_avatar = new_avatar.map(|_| current.profile_image.clone());
        changes.profile_image = new_avatar.map(|a| a.url.clone());

        let updated = UserRepository::update_profile(db, user_id, changes)
            .await
            .map_err(|e| {
                if is_unique_violation(&e) {
                    ApiError::DuplicateIdentity(USERNAME_TAKEN.to_string())
                } else {
                    ApiError::Internal(e)
                }
            })?
            .ok_or_else(|| ApiError::NotFound("User not found".to_string()))?;

        Ok((updated.to_public(), previous_avatar))
    }
}
