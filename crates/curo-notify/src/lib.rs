//! Curo Notify - Transactional email
//!
//! Templated transactional email with a pluggable sending backend:
//! - [`Mailer`] - the sending abstraction
//! - [`SendGridMailer`] - SendGrid v3 HTTP implementation
//! - [`templates`] - message builders for every notification the
//!   orchestrator sends

pub mod error;
pub mod mailer;
pub mod sendgrid;
pub mod templates;

pub use error::NotifyError;
pub use mailer::{Email, Mailer};
pub use sendgrid::SendGridMailer;
