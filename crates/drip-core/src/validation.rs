//! Per-entity validation, run before every create and update

use chrono::{DateTime, Utc};
use drip_common::types::{EmailAddress, Id};
use drip_common::{Error, Result};
use drip_storage::models::{
    Campaign, CampaignCustomer, Customer, EmailLog, EmailTemplate, Settings, Stage, Step,
};

/// Input validation for an entity about to be persisted
pub trait Validate {
    fn validate(&self) -> Result<()>;
}

fn invalid(message: &str) -> Error {
    Error::Validation(message.to_string())
}

fn required(value: &str, message: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(invalid(message));
    }
    Ok(())
}

fn positive(id: Id, message: &str) -> Result<()> {
    if id <= 0 {
        return Err(invalid(message));
    }
    Ok(())
}

fn date_range(start: Option<DateTime<Utc>>, end: Option<DateTime<Utc>>) -> Result<()> {
    match (start, end) {
        (Some(start), Some(end)) if end < start => {
            Err(invalid("End date must not precede start date"))
        }
        _ => Ok(()),
    }
}

impl Validate for Campaign {
    fn validate(&self) -> Result<()> {
        required(&self.name, "Name is required")?;
        date_range(self.start_date, self.end_date)
    }
}

impl Validate for Stage {
    fn validate(&self) -> Result<()> {
        positive(self.campaign_id, "Campaign ID is required")?;
        if self.order < 0 {
            return Err(invalid("Order must not be negative"));
        }
        Ok(())
    }
}

impl Validate for Step {
    fn validate(&self) -> Result<()> {
        positive(self.stage_id, "Stage ID is required")?;
        if self.wait_time < 0 {
            return Err(invalid("Wait time must not be negative"));
        }
        if let Some(template_id) = self.email_template_id {
            positive(template_id, "Email template ID must be positive")?;
        }
        Ok(())
    }
}

impl Validate for Customer {
    fn validate(&self) -> Result<()> {
        required(&self.email, "Email is required")?;
        required(&self.first_name, "First name is required")?;
        required(&self.last_name, "Last name is required")?;
        if EmailAddress::parse(&self.email).is_none() {
            return Err(invalid("Invalid email format"));
        }
        Ok(())
    }
}

impl Validate for CampaignCustomer {
    fn validate(&self) -> Result<()> {
        positive(self.campaign_id, "Campaign ID is required")?;
        positive(self.customer_id, "Customer ID is required")?;
        date_range(self.start_date, self.end_date)
    }
}

impl Validate for EmailTemplate {
    fn validate(&self) -> Result<()> {
        required(&self.name, "Name is required")?;
        match self.content_type.as_str() {
            EmailTemplate::PLAIN | EmailTemplate::HTML => Ok(()),
            _ => Err(invalid("Content type must be text/plain or text/html")),
        }
    }
}

impl Validate for Settings {
    fn validate(&self) -> Result<()> {
        if self.email_polling_seconds < 0 {
            return Err(invalid("Email polling interval must not be negative"));
        }
        Ok(())
    }
}

impl Validate for EmailLog {
    fn validate(&self) -> Result<()> {
        required(&self.status, "Status is required")
    }
}
