//! Contact-form submissions.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use dryfruit_core::{ContactId, ContactStatus, Email};

/// Longest accepted message body.
pub const MAX_MESSAGE_LENGTH: usize = 5000;

/// A message left through the contact form.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ContactSubmission {
    pub id: ContactId,
    pub name: String,
    pub email: String,
    pub phone: Option<String>,
    pub message: String,
    pub status: ContactStatus,
    pub created_at: DateTime<Utc>,
}

/// Raw form input.
#[derive(Debug, Clone, Deserialize)]
pub struct ContactForm {
    pub name: String,
    pub email: String,
    #[serde(default)]
    pub phone: Option<String>,
    pub message: String,
}

/// A validated submission ready to store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewContact {
    pub name: String,
    pub email: Email,
    pub phone: Option<String>,
    pub message: String,
}

impl ContactForm {
    /// Validate and normalize the form.
    ///
    /// # Errors
    ///
    /// Returns a user-facing message describing the first problem.
    pub fn validate(self) -> Result<NewContact, String> {
        let name = self.name.trim();
        let message = self.message.trim();
        if name.is_empty() || message.is_empty() {
            return Err("Name and message are required.".to_owned());
        }
        if message.chars().count() > MAX_MESSAGE_LENGTH {
            return Err(format!(
                "Message must be at most {MAX_MESSAGE_LENGTH} characters."
            ));
        }
        let email = Email::parse(&self.email)
            .map_err(|_| "Please enter a valid email address.".to_owned())?;

        Ok(NewContact {
            name: name.to_owned(),
            email,
            phone: self
                .phone
                .map(|p| p.trim().to_owned())
                .filter(|p| !p.is_empty()),
            message: message.to_owned(),
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn form(name: &str, email: &str, message: &str) -> ContactForm {
        ContactForm {
            name: name.to_owned(),
            email: email.to_owned(),
            phone: Some("   ".to_owned()),
            message: message.to_owned(),
        }
    }

    #[test]
    fn test_validate_normalizes() {
        let contact = form(" Ravi ", "Ravi@Example.com", " Do you ship to Pune? ")
            .validate()
            .unwrap();
        assert_eq!(contact.name, "Ravi");
        assert_eq!(contact.email.as_str(), "ravi@example.com");
        assert_eq!(contact.phone, None);
        assert_eq!(contact.message, "Do you ship to Pune?");
    }

    #[test]
    fn test_validate_rejects() {
        assert!(form("", "a@b.co", "hi").validate().is_err());
        assert!(form("Ravi", "a@b.co", "  ").validate().is_err());
        assert!(form("Ravi", "nope", "hi").validate().is_err());
        let long = "x".repeat(MAX_MESSAGE_LENGTH + 1);
        assert!(form("Ravi", "a@b.co", &long).validate().is_err());
    }
}
