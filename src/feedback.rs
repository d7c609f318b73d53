//! Feedback submission to the form relay.
//!
//! Feedback goes to a third-party form relay rather than the library
//! backend, as a multipart post with the relay's control fields. The
//! relay rejects large attachments, so the size cap is enforced here
//! before anything is sent.

use crate::error::{AppError, Result};
use reqwest::multipart::{Form, Part};

/// Attachment size limit imposed by the relay.
pub const MAX_ATTACHMENT_BYTES: usize = 10 * 1024 * 1024;

/// A file attached to feedback.
#[derive(Debug, Clone)]
pub struct Attachment {
    /// Filename shown to the recipient.
    pub file_name: String,
    /// File contents.
    pub contents: Vec<u8>,
}

/// User-submitted feedback.
#[derive(Debug, Clone)]
pub struct FeedbackForm {
    /// The feedback text.
    pub message: String,
    /// Feedback category, e.g. "Bug" or "Suggestion".
    pub category: String,
    /// Rating from the feedback form.
    pub rating: u8,
    /// Reply address; the relay sees "Anonymous" when absent.
    pub email: Option<String>,
    /// Optional attachment, capped at [`MAX_ATTACHMENT_BYTES`].
    pub attachment: Option<Attachment>,
}

/// Outcome reported to the caller.
#[derive(Debug, Clone)]
pub struct FeedbackReceipt {
    /// Whether the relay accepted the submission.
    pub success: bool,
    /// Human-readable confirmation.
    pub message: String,
}

/// Client for the form relay endpoint.
pub struct FeedbackClient {
    http: reqwest::Client,
    endpoint: String,
}

impl FeedbackClient {
    /// Create a client posting to `endpoint`.
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            endpoint: endpoint.into(),
        }
    }

    /// Submit `form` to the relay.
    pub async fn submit(&self, form: FeedbackForm) -> Result<FeedbackReceipt> {
        if let Some(attachment) = &form.attachment
            && attachment.contents.len() > MAX_ATTACHMENT_BYTES
        {
            return Err(AppError::Validation(
                "File size must be less than 10MB".to_string(),
            ));
        }

        let mut multipart = Form::new()
            .text(
                "_subject",
                format!("Faculty E-Library Feedback: {}", form.category),
            )
            .text("_template", "detailed")
            .text("feedback", form.message)
            .text("category", form.category)
            .text("rating", form.rating.to_string())
            .text(
                "email",
                form.email.unwrap_or_else(|| "Anonymous".to_string()),
            );

        if let Some(attachment) = form.attachment {
            multipart = multipart
                .part(
                    "attachment",
                    Part::bytes(attachment.contents).file_name(attachment.file_name),
                )
                .text("_attach_file", "true");
        }

        let response = self
            .http
            .post(&self.endpoint)
            .multipart(multipart)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(AppError::Remote {
                status: status.as_u16(),
                message: "Feedback submission failed".to_string(),
            });
        }

        Ok(FeedbackReceipt {
            success: true,
            message: "Feedback submitted successfully".to_string(),
        })
    }
}
