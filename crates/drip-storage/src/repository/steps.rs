//! Step repository that attaches the referenced email template on read

use super::Repository;
use crate::models::{EmailTemplate, Step};
use async_trait::async_trait;
use drip_common::types::Id;
use drip_common::Result;
use std::collections::HashMap;
use std::sync::Arc;

/// Wraps a step repository and preloads `email_template` on every returned step
pub struct StepRepository {
    steps: Arc<dyn Repository<Step>>,
    templates: Arc<dyn Repository<EmailTemplate>>,
}

impl StepRepository {
    pub fn new(
        steps: Arc<dyn Repository<Step>>,
        templates: Arc<dyn Repository<EmailTemplate>>,
    ) -> Self {
        Self { steps, templates }
    }

    async fn attach(&self, mut step: Step) -> Result<Step> {
        step.email_template = match step.email_template_id {
            Some(id) => self.templates.get(id).await?,
            None => None,
        };
        Ok(step)
    }

    async fn attach_opt(&self, step: Option<Step>) -> Result<Option<Step>> {
        match step {
            Some(step) => Ok(Some(self.attach(step).await?)),
            None => Ok(None),
        }
    }
}

#[async_trait]
impl Repository<Step> for StepRepository {
    async fn create(&self, entity: Step) -> Result<Step> {
        let step = self.steps.create(entity).await?;
        self.attach(step).await
    }

    async fn list(&self) -> Result<Vec<Step>> {
        let steps = self.steps.list().await?;
        if steps.iter().all(|s| s.email_template_id.is_none()) {
            return Ok(steps);
        }

        let templates: HashMap<Id, EmailTemplate> = self
            .templates
            .list()
            .await?
            .into_iter()
            .map(|t| (t.record.id, t))
            .collect();

        Ok(steps
            .into_iter()
            .map(|mut step| {
                step.email_template = step
                    .email_template_id
                    .and_then(|id| templates.get(&id).cloned());
                step
            })
            .collect())
    }

    async fn get(&self, id: Id) -> Result<Option<Step>> {
        let step = self.steps.get(id).await?;
        self.attach_opt(step).await
    }

    async fn first(&self) -> Result<Option<Step>> {
        let step = self.steps.first().await?;
        self.attach_opt(step).await
    }

    async fn update(&self, mut entity: Step) -> Result<Option<Step>> {
        entity.email_template = None;
        let step = self.steps.update(entity).await?;
        self.attach_opt(step).await
    }

    async fn delete(&self, id: Id) -> Result<bool> {
        self.steps.delete(id).await
    }
}
