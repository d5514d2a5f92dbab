use chrono::Utc;
use sea_orm::{ActiveValue, QueryFilter, QueryOrder, prelude::*};

use crate::{EngineError, ResultEngine, User, users};

use super::Engine;

const MIN_USERNAME_LEN: usize = 3;
const MIN_PASSWORD_LEN: usize = 6;
const BAD_CREDENTIALS: &str = "Invalid username or password";

fn validate_password(password: &str, label: &str) -> ResultEngine<()> {
    if password.chars().count() < MIN_PASSWORD_LEN {
        return Err(EngineError::invalid(format!(
            "{label} must be at least {MIN_PASSWORD_LEN} characters long"
        )));
    }
    Ok(())
}

/// Bcrypt is CPU bound: keep it off the async workers.
async fn hash_password(password: String, cost: u32) -> ResultEngine<String> {
    tokio::task::spawn_blocking(move || bcrypt::hash(password, cost))
        .await
        .map_err(|err| EngineError::Internal(err.to_string()))?
        .map_err(|err| EngineError::Internal(err.to_string()))
}

async fn verify_password(password: String, hash: String) -> ResultEngine<bool> {
    tokio::task::spawn_blocking(move || bcrypt::verify(password, &hash))
        .await
        .map_err(|err| EngineError::Internal(err.to_string()))?
        .map_err(|err| EngineError::Internal(err.to_string()))
}

impl Engine {
    /// Creates an account with a bcrypt-hashed password.
    pub async fn register_user(&self, username: &str, password: &str) -> ResultEngine<User> {
        let username = username.trim();
        if username.is_empty() || password.is_empty() {
            return Err(EngineError::invalid("Username and password are required"));
        }
        if username.chars().count() < MIN_USERNAME_LEN {
            return Err(EngineError::invalid(format!(
                "Username must be at least {MIN_USERNAME_LEN} characters long"
            )));
        }
        validate_password(password, "Password")?;

        let taken = users::Entity::find()
            .filter(users::Column::Username.eq(username))
            .one(&self.database)
            .await?;
        if taken.is_some() {
            return Err(EngineError::ExistingKey(
                "Username already exists".to_string(),
            ));
        }

        let hash = hash_password(password.to_string(), self.bcrypt_cost).await?;
        let model = users::ActiveModel {
            id: ActiveValue::NotSet,
            username: ActiveValue::Set(username.to_string()),
            password: ActiveValue::Set(hash),
            created_at: ActiveValue::Set(Utc::now()),
        }
        .insert(&self.database)
        .await?;
        tracing::info!(user_id = model.id, "user registered");
        Ok(User::from(model))
    }

    /// Checks credentials.
    ///
    /// Unknown usernames and wrong passwords fail with the same message.
    pub async fn authenticate(&self, username: &str, password: &str) -> ResultEngine<User> {
        if username.trim().is_empty() || password.is_empty() {
            return Err(EngineError::invalid("Username and password are required"));
        }
        let model = users::Entity::find()
            .filter(users::Column::Username.eq(username.trim()))
            .one(&self.database)
            .await?
            .ok_or_else(|| EngineError::Unauthorized(BAD_CREDENTIALS.to_string()))?;
        if !verify_password(password.to_string(), model.password.clone()).await? {
            return Err(EngineError::Unauthorized(BAD_CREDENTIALS.to_string()));
        }
        Ok(User::from(model))
    }

    pub async fn user(&self, id: i64) -> ResultEngine<User> {
        users::Entity::find_by_id(id)
            .one(&self.database)
            .await?
            .map(User::from)
            .ok_or_else(|| EngineError::not_found("User not found"))
    }

    /// All accounts, newest first.
    pub async fn list_users(&self) -> ResultEngine<Vec<User>> {
        let models = users::Entity::find()
            .order_by_desc(users::Column::CreatedAt)
            .order_by_desc(users::Column::Id)
            .all(&self.database)
            .await?;
        Ok(models.into_iter().map(User::from).collect())
    }

    pub async fn change_password(
        &self,
        user_id: i64,
        current_password: &str,
        new_password: &str,
    ) -> ResultEngine<()> {
        if current_password.is_empty() || new_password.is_empty() {
            return Err(EngineError::invalid(
                "Current password and new password are required",
            ));
        }
        validate_password(new_password, "New password")?;

        let model = users::Entity::find_by_id(user_id)
            .one(&self.database)
            .await?
            .ok_or_else(|| EngineError::not_found("User not found"))?;
        if !verify_password(current_password.to_string(), model.password.clone()).await? {
            return Err(EngineError::invalid("Current password is incorrect"));
        }

        let hash = hash_password(new_password.to_string(), self.bcrypt_cost).await?;
        let mut model: users::ActiveModel = model.into();
        model.password = ActiveValue::Set(hash);
        model.update(&self.database).await?;
        tracing::info!(user_id, "password changed");
        Ok(())
    }

    /// Hard-deletes an account other than the caller's own.
    pub async fn delete_user(&self, id: i64, acting_user_id: i64) -> ResultEngine<()> {
        if id == acting_user_id {
            return Err(EngineError::invalid("You cannot delete your own account"));
        }
        let result = users::Entity::delete_by_id(id)
            .exec(&self.database)
            .await?;
        if result.rows_affected == 0 {
            return Err(EngineError::not_found("User not found"));
        }
        tracing::info!(user_id = id, deleted_by = acting_user_id, "user deleted");
        Ok(())
    }
}
