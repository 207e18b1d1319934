//! Bundle of repositories handed to the API layer

use crate::db::DatabasePool;
use crate::models::{
    Campaign, CampaignCustomer, Customer, EmailLog, EmailTemplate, Settings, Stage, Step, User,
};
use crate::repository::{MemoryStore, PgStore, Repository, StepRepository, UserRepository};
use drip_common::Result;
use std::sync::Arc;

/// Every repository the service uses, backed by one storage backend
#[derive(Clone)]
pub struct Store {
    pub campaigns: Arc<dyn Repository<Campaign>>,
    pub stages: Arc<dyn Repository<Stage>>,
    /// Steps with their email template preloaded
    pub steps: Arc<dyn Repository<Step>>,
    pub customers: Arc<dyn Repository<Customer>>,
    pub campaign_customers: Arc<dyn Repository<CampaignCustomer>>,
    pub templates: Arc<dyn Repository<EmailTemplate>>,
    pub email_logs: Arc<dyn Repository<EmailLog>>,
    pub settings: Arc<dyn Repository<Settings>>,
    pub users: Arc<dyn UserRepository>,
    pool: Option<DatabasePool>,
}

impl Store {
    /// Store backed by PostgreSQL
    pub fn postgres(pool: DatabasePool) -> Self {
        let templates: Arc<dyn Repository<EmailTemplate>> =
            Arc::new(PgStore::<EmailTemplate>::new(pool.clone()));
        let steps = StepRepository::new(
            Arc::new(PgStore::<Step>::new(pool.clone())),
            templates.clone(),
        );

        Self {
            campaigns: Arc::new(PgStore::<Campaign>::new(pool.clone())),
            stages: Arc::new(PgStore::<Stage>::new(pool.clone())),
            steps: Arc::new(steps),
            customers: Arc::new(PgStore::<Customer>::new(pool.clone())),
            campaign_customers: Arc::new(PgStore::<CampaignCustomer>::new(pool.clone())),
            templates,
            email_logs: Arc::new(PgStore::<EmailLog>::new(pool.clone())),
            settings: Arc::new(PgStore::<Settings>::new(pool.clone())),
            users: Arc::new(PgStore::<User>::new(pool.clone())),
            pool: Some(pool),
        }
    }

    /// Store kept entirely in process memory
    pub fn memory() -> Self {
        let templates: Arc<dyn Repository<EmailTemplate>> =
            Arc::new(MemoryStore::<EmailTemplate>::new());
        let steps = StepRepository::new(Arc::new(MemoryStore::<Step>::new()), templates.clone());

        Self {
            campaigns: Arc::new(MemoryStore::<Campaign>::new()),
            stages: Arc::new(MemoryStore::<Stage>::new()),
            steps: Arc::new(steps),
            customers: Arc::new(MemoryStore::<Customer>::new()),
            campaign_customers: Arc::new(MemoryStore::<CampaignCustomer>::new()),
            templates,
            email_logs: Arc::new(MemoryStore::<EmailLog>::new()),
            settings: Arc::new(MemoryStore::<Settings>::new()),
            users: Arc::new(MemoryStore::<User>::new()),
            pool: None,
        }
    }

    /// Backend name, for logs and health output
    pub fn backend(&self) -> &'static str {
        if self.pool.is_some() {
            "postgres"
        } else {
            "memory"
        }
    }

    /// Check that the backend is reachable
    pub async fn ping(&self) -> Result<()> {
        match &self.pool {
            Some(pool) => pool.health_check().await,
            None => Ok(()),
        }
    }
}
