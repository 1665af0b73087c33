//! Public contact form and email address validation.

use std::fmt;

use serde::Deserialize;
use thiserror::Error;

use crate::newsletter::{MailError, Mailer, OutgoingEmail};
use crate::util::to_single_line;

const MAX_NAME_CHARS: usize = 100;
const MAX_EMAIL_CHARS: usize = 255;
const MAX_MESSAGE_CHARS: usize = 2000;

/// A field that failed validation. Shown inline next to the field.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{field}: {message}")]
pub struct ValidationError {
    pub field: &'static str,
    pub message: String,
}

impl ValidationError {
    pub fn new(field: &'static str, message: impl Into<String>) -> Self {
        Self {
            field,
            message: message.into(),
        }
    }
}

// ============================================================================
// Email addresses
// ============================================================================

/// A syntactically valid email address, trimmed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubscriberEmail(String);

impl SubscriberEmail {
    /// # Examples
    ///
    /// ```
    /// use gazette::contact::SubscriberEmail;
    ///
    /// assert!(SubscriberEmail::parse(" reader@example.com ").is_ok());
    /// assert!(SubscriberEmail::parse("reader@localhost").is_err());
    /// ```
    pub fn parse(raw: &str) -> Result<Self, ValidationError> {
        let email = raw.trim();
        let invalid = || ValidationError::new("email", "Invalid email address");

        if email.chars().count() > MAX_EMAIL_CHARS {
            return Err(ValidationError::new(
                "email",
                format!("Email must be at most {MAX_EMAIL_CHARS} characters"),
            ));
        }
        if email.chars().any(|c| c.is_whitespace() || c.is_control()) {
            return Err(invalid());
        }

        let (local, domain) = email.split_once('@').ok_or_else(invalid)?;
        if local.is_empty() || domain.contains('@') {
            return Err(invalid());
        }
        // At least two labels, none empty
        if !domain.contains('.') || domain.split('.').any(str::is_empty) {
            return Err(invalid());
        }

        Ok(Self(email.to_owned()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl AsRef<str> for SubscriberEmail {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SubscriberEmail {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// ============================================================================
// Contact form
// ============================================================================

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ContactForm {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub message: String,
}

#[derive(Debug, Error)]
pub enum ContactError {
    #[error("Validation error: {0}")]
    Invalid(#[from] ValidationError),
    #[error("Could not send message: {0}")]
    Mail(#[from] MailError),
}

impl ContactForm {
    /// Check every field in form order and report the first violation
    pub fn validate(&self) -> Result<(), ValidationError> {
        check_length("first_name", "First name", &self.first_name, MAX_NAME_CHARS)?;
        check_length("last_name", "Last name", &self.last_name, MAX_NAME_CHARS)?;
        SubscriberEmail::parse(&self.email)?;
        check_length("message", "Message", &self.message, MAX_MESSAGE_CHARS)?;
        Ok(())
    }

    fn to_email(&self, contact_address: &str) -> OutgoingEmail {
        let first = to_single_line(&self.first_name);
        let last = to_single_line(&self.last_name);
        OutgoingEmail {
            to: contact_address.to_string(),
            subject: format!("Contact form: {} {}", first, last),
            body: format!(
                "From: {} {} <{}>\n\n{}",
                first,
                last,
                self.email.trim(),
                self.message.trim()
            ),
        }
    }
}

fn check_length(
    field: &'static str,
    label: &str,
    value: &str,
    max: usize,
) -> Result<(), ValidationError> {
    let len = value.trim().chars().count();
    if len == 0 {
        return Err(ValidationError::new(field, format!("{label} is required")));
    }
    if len > max {
        return Err(ValidationError::new(
            field,
            format!("{label} must be at most {max} characters"),
        ));
    }
    Ok(())
}

/// Validate the form and mail it to the site's contact address
pub async fn send_contact<M: Mailer>(
    mailer: &M,
    contact_address: &str,
    form: &ContactForm,
) -> Result<(), ContactError> {
    form.validate()?;
    mailer.send(&form.to_email(contact_address)).await?;
    tracing::info!("Contact message sent");
    Ok(())
}
