use std::sync::Arc;

use sea_orm::{ActiveModelBehavior, ActiveModelTrait, ColumnTrait, EntityTrait, QueryFilter, Set};

use crate::auth::password::{MIN_PASSWORD_LEN, hash_password};
use crate::database::Database;
use crate::entities::admin;
use crate::error::{AppError, AppResult, DbResultExt};

/// Identities compare case-insensitively.
pub fn normalize_identity(identity: &str) -> String {
    identity.trim().to_lowercase()
}

/// Provisioning of administrator accounts. Only reachable from the CLI.
pub struct AdminService {
    db: Arc<Database>,
}

impl AdminService {
    pub fn new(db: Arc<Database>) -> Self {
        Self { db }
    }

    pub async fn find_by_identity(&self, identity: &str) -> AppResult<Option<admin::Model>> {
        admin::Entity::find()
            .filter(admin::Column::Identity.eq(normalize_identity(identity)))
            .one(&self.db.conn)
            .await
            .db_context("Failed to look up admin")
    }

    pub async fn create(&self, identity: &str, password: &str) -> AppResult<admin::Model> {
        let identity = validate_identity(identity)?;
        let password_hash = hash_for_storage(password).await?;

        if self.find_by_identity(&identity).await?.is_some() {
            return Err(AppError::Conflict(format!(
                "Admin '{identity}' already exists"
            )));
        }

        let mut model = admin::ActiveModel::new();
        model.identity = Set(identity.clone());
        model.password_hash = Set(password_hash);

        let created = model
            .insert(&self.db.conn)
            .await
            .db_context("Failed to create admin")?;

        log::info!("Admin created: '{}' (ID: {})", identity, created.id);
        Ok(created)
    }

    pub async fn set_password(&self, identity: &str, password: &str) -> AppResult<admin::Model> {
        let password_hash = hash_for_storage(password).await?;

        let existing = self.find_by_identity(identity).await?.ok_or_else(|| {
            AppError::validation("identity", format!("no admin named '{identity}'"))
        })?;

        let mut model: admin::ActiveModel = existing.into();
        model.password_hash = Set(password_hash);
        let updated = model
            .update(&self.db.conn)
            .await
            .db_context("Failed to update admin password")?;

        log::info!("Admin password updated: '{}'", updated.identity);
        Ok(updated)
    }
}

fn validate_identity(identity: &str) -> AppResult<String> {
    let identity = normalize_identity(identity);
    if identity.is_empty() {
        return Err(AppError::validation("identity", "is required"));
    }
    if identity.len() > 254 || identity.chars().any(char::is_whitespace) {
        return Err(AppError::validation(
            "identity",
            "must be a username or email without spaces",
        ));
    }
    Ok(identity)
}

async fn hash_for_storage(password: &str) -> AppResult<String> {
    if password.chars().count() < MIN_PASSWORD_LEN {
        return Err(AppError::validation(
            "password",
            format!("must be at least {MIN_PASSWORD_LEN} characters long"),
        ));
    }
    let password = password.to_string();
    let hash = tokio::task::spawn_blocking(move || hash_password(&password))
        .await
        .map_err(|e| color_eyre::eyre::eyre!("Password hashing task failed: {e}"))??;
    Ok(hash)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::password::verify_password;
    use crate::entities::admin::Role;
    use crate::test_utils::test_db;

    #[tokio::test]
    async fn test_create_admin_stores_hash_only() {
        let db = test_db().await;
        let service = AdminService::new(db);

        let admin = service
            .create("  Owner@Example.com ", "s3cret-pass")
            .await
            .unwrap();

        assert_eq!(admin.identity, "owner@example.com");
        assert_eq!(admin.role, Role::Admin);
        assert_ne!(admin.password_hash, "s3cret-pass");
        assert!(verify_password(&admin.password_hash, "s3cret-pass"));
    }

    #[tokio::test]
    async fn test_duplicate_identity_conflicts() {
        let db = test_db().await;
        let service = AdminService::new(db);

        service.create("owner", "password-1").await.unwrap();
        let err = service.create("OWNER", "password-2").await.unwrap_err();
        assert!(matches!(err, AppError::Conflict(_)));
    }

    #[tokio::test]
    async fn test_short_password_rejected() {
        let db = test_db().await;
        let service = AdminService::new(db);

        let err = service.create("owner", "short").await.unwrap_err();
        assert!(matches!(err, AppError::Validation { ref field, .. } if field == "password"));
    }

    #[tokio::test]
    async fn test_set_password() {
        let db = test_db().await;
        let service = AdminService::new(db);

        service.create("owner", "first-password").await.unwrap();
        let updated = service
            .set_password("owner", "second-password")
            .await
            .unwrap();

        assert!(verify_password(&updated.password_hash, "second-password"));
        assert!(!verify_password(&updated.password_hash, "first-password"));

        let missing = service.set_password("nobody", "whatever-pass").await;
        assert!(matches!(missing, Err(AppError::Validation { .. })));
    }
}
