//! Generic entity handlers
//!
//! Every entity exposes the same five operations; a `Resource` names the
//! entity for messages and picks its repository from the store.

use axum::{
    body::Bytes,
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use drip_common::types::Id;
use drip_core::Validate;
use drip_storage::models::{
    Campaign, CampaignCustomer, Customer, EmailLog, EmailTemplate, Stage, Step,
};
use drip_storage::{Entity, Repository, Store};
use std::sync::Arc;
use tracing::{debug, info};

use crate::auth::AppState;
use crate::error::{ApiError, MessageResponse};
use crate::payload::{decode_object, merge_into};

/// A parent row an entity points at
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reference {
    Campaign(Id),
    Stage(Id),
    Customer(Id),
    EmailTemplate(Id),
}

/// An entity served over the generic handlers
pub trait Resource: Entity + Validate {
    /// Singular name used in messages, e.g. "Campaign customer"
    const LABEL: &'static str;

    /// Plural used in list failures, e.g. "campaign customers"
    const PLURAL: &'static str;

    /// Fields computed on read that requests may not set
    const DERIVED_FIELDS: &'static [&'static str] = &[];

    fn repository(store: &Store) -> &Arc<dyn Repository<Self>>;

    /// Parent rows that must exist and be live before this entity is stored
    fn references(&self) -> Vec<Reference> {
        Vec::new()
    }
}

impl Resource for Campaign {
    const LABEL: &'static str = "Campaign";
    const PLURAL: &'static str = "campaigns";

    fn repository(store: &Store) -> &Arc<dyn Repository<Self>> {
        &store.campaigns
    }
}

impl Resource for Stage {
    const LABEL: &'static str = "Stage";
    const PLURAL: &'static str = "stages";

    fn repository(store: &Store) -> &Arc<dyn Repository<Self>> {
        &store.stages
    }

    fn references(&self) -> Vec<Reference> {
        vec![Reference::Campaign(self.campaign_id)]
    }
}

impl Resource for Step {
    const LABEL: &'static str = "Step";
    const PLURAL: &'static str = "steps";
    const DERIVED_FIELDS: &'static [&'static str] = &["email_template"];

    fn repository(store: &Store) -> &Arc<dyn Repository<Self>> {
        &store.steps
    }

    fn references(&self) -> Vec<Reference> {
        let mut references = vec![Reference::Stage(self.stage_id)];
        references.extend(self.email_template_id.map(Reference::EmailTemplate));
        references
    }
}

impl Resource for Customer {
    const LABEL: &'static str = "Customer";
    const PLURAL: &'static str = "customers";

    fn repository(store: &Store) -> &Arc<dyn Repository<Self>> {
        &store.customers
    }
}

impl Resource for CampaignCustomer {
    const LABEL: &'static str = "Campaign customer";
    const PLURAL: &'static str = "campaign customers";

    fn repository(store: &Store) -> &Arc<dyn Repository<Self>> {
        &store.campaign_customers
    }

    fn references(&self) -> Vec<Reference> {
        vec![
            Reference::Campaign(self.campaign_id),
            Reference::Customer(self.customer_id),
        ]
    }
}

impl Resource for EmailTemplate {
    const LABEL: &'static str = "Email template";
    const PLURAL: &'static str = "email templates";

    fn repository(store: &Store) -> &Arc<dyn Repository<Self>> {
        &store.templates
    }
}

impl Resource for EmailLog {
    const LABEL: &'static str = "Email log";
    const PLURAL: &'static str = "email logs";

    fn repository(store: &Store) -> &Arc<dyn Repository<Self>> {
        &store.email_logs
    }
}

/// Parse a path id; anything non-numeric becomes 0, which matches no row
pub fn parse_id(raw: &str) -> Id {
    raw.parse().unwrap_or(0)
}

fn not_found<T: Resource>() -> ApiError {
    ApiError::NotFound(format!("{} not found", T::LABEL))
}

fn failed<T: Resource>(action: &str) -> String {
    format!("Failed to {} {}", action, T::LABEL.to_lowercase())
}

/// Look up a live row or fail with 404
async fn find<T: Resource>(store: &Store, id: Id, action: &str) -> Result<T, ApiError> {
    T::repository(store)
        .get(id)
        .await
        .map_err(|e| ApiError::from_error(e, &failed::<T>(action)))?
        .ok_or_else(not_found::<T>)
}

/// Reject an entity whose parents are missing or soft-deleted
async fn check_references<T: Resource>(
    store: &Store,
    entity: &T,
    action: &str,
) -> Result<(), ApiError> {
    for reference in entity.references() {
        let found = match reference {
            Reference::Campaign(id) => store.campaigns.get(id).await.map(|row| row.is_some()),
            Reference::Stage(id) => store.stages.get(id).await.map(|row| row.is_some()),
            Reference::Customer(id) => store.customers.get(id).await.map(|row| row.is_some()),
            Reference::EmailTemplate(id) => store.templates.get(id).await.map(|row| row.is_some()),
        }
        .map_err(|e| ApiError::from_error(e, &failed::<T>(action)))?;

        if !found {
            debug!("{} references missing {:?}", T::LABEL, reference);
            return Err(ApiError::BadRequest(
                "Referenced record does not exist".to_string(),
            ));
        }
    }
    Ok(())
}

/// Create an entity
pub async fn create<T: Resource>(
    State(state): State<Arc<AppState>>,
    body: Bytes,
) -> Result<(StatusCode, Json<T>), ApiError> {
    let fields = decode_object(&body)?;
    let entity: T = merge_into(&T::default(), fields, T::DERIVED_FIELDS)?;
    entity
        .validate()
        .map_err(|e| ApiError::from_error(e, &failed::<T>("create")))?;
    check_references(&state.store, &entity, "create").await?;

    let created = T::repository(&state.store)
        .create(entity)
        .await
        .map_err(|e| ApiError::from_error(e, &failed::<T>("create")))?;

    info!("Created {} {}", T::LABEL.to_lowercase(), created.record().id);
    Ok((StatusCode::CREATED, Json(created)))
}

/// List every live entity
pub async fn list<T: Resource>(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<T>>, ApiError> {
    let rows = T::repository(&state.store)
        .list()
        .await
        .map_err(|e| ApiError::from_error(e, &format!("Failed to retrieve {}", T::PLURAL)))?;

    Ok(Json(rows))
}

/// Get an entity by id
pub async fn get<T: Resource>(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<T>, ApiError> {
    let entity = find::<T>(&state.store, parse_id(&id), "retrieve").await?;
    Ok(Json(entity))
}

/// Update an entity by id, merging the body onto the stored row
pub async fn update<T: Resource>(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    body: Bytes,
) -> Result<Json<T>, ApiError> {
    let existing = find::<T>(&state.store, parse_id(&id), "update").await?;

    let fields = decode_object(&body)?;
    let entity: T = merge_into(&existing, fields, T::DERIVED_FIELDS)?;
    entity
        .validate()
        .map_err(|e| ApiError::from_error(e, &failed::<T>("update")))?;
    check_references(&state.store, &entity, "update").await?;

    let updated = T::repository(&state.store)
        .update(entity)
        .await
        .map_err(|e| ApiError::from_error(e, &failed::<T>("update")))?
        .ok_or_else(not_found::<T>)?;

    info!("Updated {} {}", T::LABEL.to_lowercase(), updated.record().id);
    Ok(Json(updated))
}

/// Soft-delete an entity by id
pub async fn delete<T: Resource>(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<MessageResponse>, ApiError> {
    let id = parse_id(&id);
    find::<T>(&state.store, id, "delete").await?;

    let deleted = T::repository(&state.store)
        .delete(id)
        .await
        .map_err(|e| ApiError::from_error(e, &failed::<T>("delete")))?;
    if !deleted {
        return Err(not_found::<T>());
    }

    info!("Deleted {} {}", T::LABEL.to_lowercase(), id);
    Ok(Json(MessageResponse::new(format!(
        "{} deleted successfully",
        T::LABEL
    ))))
}
