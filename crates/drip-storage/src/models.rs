//! Database models

use crate::entity::{Entity, PgQueryAs, Record};
use chrono::{DateTime, Utc};
use drip_common::types::{Id, Role};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Campaign model
#[derive(Debug, Clone, Default, PartialEq, FromRow, Serialize, Deserialize)]
#[serde(default)]
pub struct Campaign {
    #[serde(flatten)]
    #[sqlx(flatten)]
    pub record: Record,
    pub name: String,
    pub description: String,
    pub status: String,
    pub start_date: Option<DateTime<Utc>>,
    pub end_date: Option<DateTime<Utc>>,
}

/// Stage model, an ordered phase of a campaign
#[derive(Debug, Clone, Default, PartialEq, FromRow, Serialize, Deserialize)]
#[serde(default)]
pub struct Stage {
    #[serde(flatten)]
    #[sqlx(flatten)]
    pub record: Record,
    pub campaign_id: Id,
    pub name: String,
    pub description: String,
    pub order: i32,
}

/// Step model, a single templated send within a stage
#[derive(Debug, Clone, Default, PartialEq, FromRow, Serialize, Deserialize)]
#[serde(default)]
pub struct Step {
    #[serde(flatten)]
    #[sqlx(flatten)]
    pub record: Record,
    pub stage_id: Id,
    pub name: String,
    pub description: String,
    pub email_template_id: Option<Id>,
    /// Delay before the step fires
    pub wait_time: i32,
    /// Referenced template, attached on read
    #[sqlx(skip)]
    pub email_template: Option<EmailTemplate>,
}

/// Customer model
#[derive(Debug, Clone, Default, PartialEq, FromRow, Serialize, Deserialize)]
#[serde(default)]
pub struct Customer {
    #[serde(flatten)]
    #[sqlx(flatten)]
    pub record: Record,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub phone: Option<String>,
    pub company: Option<String>,
    pub address: Option<String>,
    pub city: Option<String>,
    pub state: Option<String>,
    pub country: Option<String>,
    pub postal_code: Option<String>,
    pub notes: Option<String>,
    pub tags: Option<String>,
    pub email_verified: bool,
    pub subscribed: bool,
    pub last_contacted: Option<String>,
    pub lead_source: Option<String>,
    pub lead_status: Option<String>,
    pub created_by: Option<Id>,
    pub assigned_to: Option<Id>,
}

/// Enrollment of a customer in a campaign
#[derive(Debug, Clone, Default, PartialEq, FromRow, Serialize, Deserialize)]
#[serde(default)]
pub struct CampaignCustomer {
    #[serde(flatten)]
    #[sqlx(flatten)]
    pub record: Record,
    pub campaign_id: Id,
    pub customer_id: Id,
    pub status: String,
    pub start_date: Option<DateTime<Utc>>,
    pub end_date: Option<DateTime<Utc>>,
    pub subscribed: bool,
}

/// Email template model
#[derive(Debug, Clone, PartialEq, FromRow, Serialize, Deserialize)]
#[serde(default)]
pub struct EmailTemplate {
    #[serde(flatten)]
    #[sqlx(flatten)]
    pub record: Record,
    pub name: String,
    pub subject: String,
    pub body: String,
    /// "text/plain" or "text/html"
    pub content_type: String,
}

impl EmailTemplate {
    pub const PLAIN: &'static str = "text/plain";
    pub const HTML: &'static str = "text/html";
}

impl Default for EmailTemplate {
    fn default() -> Self {
        Self {
            record: Record::default(),
            name: String::new(),
            subject: String::new(),
            body: String::new(),
            content_type: Self::PLAIN.to_string(),
        }
    }
}

/// Record of a sent email, append-only
#[derive(Debug, Clone, Default, PartialEq, FromRow, Serialize, Deserialize)]
#[serde(default)]
pub struct EmailLog {
    #[serde(flatten)]
    #[sqlx(flatten)]
    pub record: Record,
    pub campaign_id: Option<Id>,
    pub customer_id: Option<Id>,
    pub email_template_id: Option<Id>,
    pub recipient: String,
    pub subject: String,
    pub body: String,
    pub sent_at: Option<DateTime<Utc>>,
    pub status: String,
}

/// Singleton settings row
#[derive(Debug, Clone, Default, PartialEq, FromRow, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    #[serde(flatten)]
    #[sqlx(flatten)]
    pub record: Record,
    pub user_id: Option<Id>,
    pub crm_api_key: String,
    /// Sender address, also the SMTP login
    pub smtp_email: String,
    /// Write-only; never returned in responses
    #[serde(skip_serializing)]
    pub smtp_password: String,
    pub email_polling_seconds: i32,
}

/// User model
#[derive(Debug, Clone, Default, PartialEq, FromRow, Serialize, Deserialize)]
#[serde(default)]
pub struct User {
    #[serde(flatten)]
    #[sqlx(flatten)]
    pub record: Record,
    pub email: String,
    #[serde(skip_serializing, default)]
    pub password_hash: String,
    pub role: String,
}

impl User {
    /// Parsed role; `None` for values outside the known set
    pub fn role(&self) -> Option<Role> {
        self.role.parse().ok()
    }
}

impl Entity for Campaign {
    const TABLE: &'static str = "campaigns";
    const COLUMNS: &'static [&'static str] =
        &["name", "description", "status", "start_date", "end_date"];

    fn record(&self) -> &Record {
        &self.record
    }

    fn record_mut(&mut self) -> &mut Record {
        &mut self.record
    }

    fn bind_columns<'q>(&'q self, query: PgQueryAs<'q, Self>) -> PgQueryAs<'q, Self> {
        query
            .bind(&self.name)
            .bind(&self.description)
            .bind(&self.status)
            .bind(self.start_date)
            .bind(self.end_date)
    }
}

impl Entity for Stage {
    const TABLE: &'static str = "stages";
    const COLUMNS: &'static [&'static str] = &["campaign_id", "name", "description", "order"];

    fn record(&self) -> &Record {
        &self.record
    }

    fn record_mut(&mut self) -> &mut Record {
        &mut self.record
    }

    fn bind_columns<'q>(&'q self, query: PgQueryAs<'q, Self>) -> PgQueryAs<'q, Self> {
        query
            .bind(self.campaign_id)
            .bind(&self.name)
            .bind(&self.description)
            .bind(self.order)
    }
}

impl Entity for Step {
    const TABLE: &'static str = "steps";
    const COLUMNS: &'static [&'static str] =
        &["stage_id", "name", "description", "email_template_id", "wait_time"];

    fn record(&self) -> &Record {
        &self.record
    }

    fn record_mut(&mut self) -> &mut Record {
        &mut self.record
    }

    fn bind_columns<'q>(&'q self, query: PgQueryAs<'q, Self>) -> PgQueryAs<'q, Self> {
        query
            .bind(self.stage_id)
            .bind(&self.name)
            .bind(&self.description)
            .bind(self.email_template_id)
            .bind(self.wait_time)
    }
}

impl Entity for Customer {
    const TABLE: &'static str = "customers";
    const COLUMNS: &'static [&'static str] = &[
        "email",
        "first_name",
        "last_name",
        "phone",
        "company",
        "address",
        "city",
        "state",
        "country",
        "postal_code",
        "notes",
        "tags",
        "email_verified",
        "subscribed",
        "last_contacted",
        "lead_source",
        "lead_status",
        "created_by",
        "assigned_to",
    ];

    fn record(&self) -> &Record {
        &self.record
    }

    fn record_mut(&mut self) -> &mut Record {
        &mut self.record
    }

    fn bind_columns<'q>(&'q self, query: PgQueryAs<'q, Self>) -> PgQueryAs<'q, Self> {
        query
            .bind(&self.email)
            .bind(&self.first_name)
            .bind(&self.last_name)
            .bind(&self.phone)
            .bind(&self.company)
            .bind(&self.address)
            .bind(&self.city)
            .bind(&self.state)
            .bind(&self.country)
            .bind(&self.postal_code)
            .bind(&self.notes)
            .bind(&self.tags)
            .bind(self.email_verified)
            .bind(self.subscribed)
            .bind(&self.last_contacted)
            .bind(&self.lead_source)
            .bind(&self.lead_status)
            .bind(self.created_by)
            .bind(self.assigned_to)
    }
}

impl Entity for CampaignCustomer {
    const TABLE: &'static str = "campaign_customers";
    const COLUMNS: &'static [&'static str] = &[
        "campaign_id",
        "customer_id",
        "status",
        "start_date",
        "end_date",
        "subscribed",
    ];

    fn record(&self) -> &Record {
        &self.record
    }

    fn record_mut(&mut self) -> &mut Record {
        &mut self.record
    }

    fn bind_columns<'q>(&'q self, query: PgQueryAs<'q, Self>) -> PgQueryAs<'q, Self> {
        query
            .bind(self.campaign_id)
            .bind(self.customer_id)
            .bind(&self.status)
            .bind(self.start_date)
            .bind(self.end_date)
            .bind(self.subscribed)
    }
}

impl Entity for EmailTemplate {
    const TABLE: &'static str = "email_templates";
    const COLUMNS: &'static [&'static str] = &["name", "subject", "body", "content_type"];

    fn record(&self) -> &Record {
        &self.record
    }

    fn record_mut(&mut self) -> &mut Record {
        &mut self.record
    }

    fn bind_columns<'q>(&'q self, query: PgQueryAs<'q, Self>) -> PgQueryAs<'q, Self> {
        query
            .bind(&self.name)
            .bind(&self.subject)
            .bind(&self.body)
            .bind(&self.content_type)
    }
}

impl Entity for EmailLog {
    const TABLE: &'static str = "email_logs";
    const COLUMNS: &'static [&'static str] = &[
        "campaign_id",
        "customer_id",
        "email_template_id",
        "recipient",
        "subject",
        "body",
        "sent_at",
        "status",
    ];

    fn record(&self) -> &Record {
        &self.record
    }

    fn record_mut(&mut self) -> &mut Record {
        &mut self.record
    }

    fn bind_columns<'q>(&'q self, query: PgQueryAs<'q, Self>) -> PgQueryAs<'q, Self> {
        query
            .bind(self.campaign_id)
            .bind(self.customer_id)
            .bind(self.email_template_id)
            .bind(&self.recipient)
            .bind(&self.subject)
            .bind(&self.body)
            .bind(self.sent_at)
            .bind(&self.status)
    }
}

impl Entity for Settings {
    const TABLE: &'static str = "settings";
    const COLUMNS: &'static [&'static str] = &[
        "user_id",
        "crm_api_key",
        "smtp_email",
        "smtp_password",
        "email_polling_seconds",
    ];

    fn record(&self) -> &Record {
        &self.record
    }

    fn record_mut(&mut self) -> &mut Record {
        &mut self.record
    }

    fn bind_columns<'q>(&'q self, query: PgQueryAs<'q, Self>) -> PgQueryAs<'q, Self> {
        query
            .bind(self.user_id)
            .bind(&self.crm_api_key)
            .bind(&self.smtp_email)
            .bind(&self.smtp_password)
            .bind(self.email_polling_seconds)
    }
}

impl Entity for User {
    const TABLE: &'static str = "users";
    const COLUMNS: &'static [&'static str] = &["email", "password_hash", "role"];

    fn record(&self) -> &Record {
        &self.record
    }

    fn record_mut(&mut self) -> &mut Record {
        &mut self.record
    }

    fn bind_columns<'q>(&'q self, query: PgQueryAs<'q, Self>) -> PgQueryAs<'q, Self> {
        query
            .bind(&self.email)
            .bind(&self.password_hash)
            .bind(&self.role)
    }

    fn unique_key(&self) -> Option<String> {
        Some(self.email.clone())
    }
}
