//! Startup seeding of the admin account and the settings row

use crate::credentials::hash_password;
use drip_common::config::AuthConfig;
use drip_common::types::Role;
use drip_common::Result;
use drip_storage::models::{Settings, User};
use drip_storage::repository::{Repository, UserRepository};
use drip_storage::Store;
use tracing::info;

/// Create the configured admin account unless a live user already has its email
pub async fn ensure_admin(store: &Store, config: &AuthConfig) -> Result<User> {
    if let Some(existing) = store.users.find_by_email(&config.admin_email).await? {
        return Ok(existing);
    }

    let admin = store
        .users
        .create(User {
            email: config.admin_email.clone(),
            password_hash: hash_password(&config.admin_password)?,
            role: Role::Admin.to_string(),
            ..Default::default()
        })
        .await?;

    info!(user_id = admin.record.id, email = %admin.email, "Created admin account");
    Ok(admin)
}

/// Seed an empty settings row if none exists
pub async fn ensure_settings(store: &Store) -> Result<Settings> {
    if let Some(existing) = store.settings.first().await? {
        return Ok(existing);
    }

    let settings = store.settings.create(Settings::default()).await?;
    info!(settings_id = settings.record.id, "Seeded settings row");
    Ok(settings)
}
