//! Drip Core - Domain services for the drip campaign service
//!
//! Password credentials, session tokens, outgoing mail, per-entity
//! validation and startup bootstrap.

pub mod bootstrap;
pub mod credentials;
pub mod mailer;
pub mod token;
pub mod validation;

pub use mailer::{Mailer, MailerError, OutgoingEmail, SenderAccount, SmtpMailer};
pub use token::{Claims, TokenError, TokenIssuer};
pub use validation::Validate;
