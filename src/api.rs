//! Remote API client.
//!
//! Thin typed wrappers over the e-library backend: OTP authentication,
//! material listing, authenticated download and multipart upload.
//! Validation errors are raised before any network call; non-2xx
//! responses surface the server-supplied message together with the
//! HTTP status.

use crate::error::{AppError, Result};
use crate::materials::Material;
use reqwest::StatusCode;
use reqwest::multipart::{Form, Part};
use serde::Deserialize;
use serde_json::json;

/// Response body of the OTP endpoints.
#[derive(Debug, Clone, Deserialize)]
pub struct AuthResponse {
    /// Human-readable server message.
    pub message: String,
    /// Bearer token, present after a successful verification.
    #[serde(default)]
    pub token: Option<String>,
    /// The authenticated user, present after a successful verification.
    #[serde(default)]
    pub user: Option<ApiUser>,
}

/// User identity as returned by the backend.
#[derive(Debug, Clone, Deserialize)]
pub struct ApiUser {
    /// Server-assigned user id.
    pub id: String,
    /// Email the OTP was sent to.
    pub email: String,
}

/// A verified login: token plus confirmed identity.
#[derive(Debug, Clone)]
pub struct AuthSession {
    /// Bearer token for subsequent requests.
    pub token: String,
    /// The authenticated user.
    pub user: ApiUser,
}

/// Bytes and suggested filename of a downloaded material.
#[derive(Debug, Clone)]
pub struct DownloadedFile {
    /// Filename from the `content-disposition` header, or the
    /// `document.pdf` default.
    pub filename: String,
    /// Raw file contents.
    pub bytes: Vec<u8>,
}

/// Fields of a material upload. All are required by the backend.
#[derive(Debug, Clone)]
pub struct MaterialUpload {
    /// Study level, e.g. "200".
    pub level: String,
    /// Course code, e.g. "CSC280".
    pub course_code: String,
    /// Course title.
    pub course_title: String,
    /// Free-form description.
    pub description: String,
    /// Name of the uploaded file.
    pub file_name: String,
    /// File contents.
    pub contents: Vec<u8>,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    message: Option<String>,
}

/// Client for the e-library backend.
pub struct ApiClient {
    http: reqwest::Client,
    base_url: String,
    email_domain: String,
}

impl ApiClient {
    /// Create a client for `base_url`, accepting only emails under
    /// `email_domain`.
    pub fn new(base_url: impl Into<String>, email_domain: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.into(),
            email_domain: email_domain.into(),
        }
    }

    fn require_institutional(&self, email: &str) -> Result<()> {
        if is_institutional_email(email, &self.email_domain) {
            Ok(())
        } else {
            Err(AppError::Validation(format!(
                "Please use your @{} email address",
                self.email_domain
            )))
        }
    }

    /// Ask the backend to email a one-time passcode.
    pub async fn request_otp(&self, email: &str) -> Result<AuthResponse> {
        self.require_institutional(email)?;

        let response = self
            .http
            .post(format!("{}/auth/request-otp", self.base_url))
            .json(&json!({ "email": email }))
            .send()
            .await?;

        parse_json(response, "Failed to request OTP").await
    }

    /// Exchange the emailed passcode for a token and identity.
    pub async fn verify_otp(&self, email: &str, otp: &str) -> Result<AuthSession> {
        let response = self
            .http
            .post(format!("{}/auth/verify-otp", self.base_url))
            .json(&json!({ "email": email, "otp": otp }))
            .send()
            .await?;

        let status = response.status();
        if status == StatusCode::UNAUTHORIZED {
            return Err(AppError::Remote {
                status: status.as_u16(),
                message: "Invalid OTP. Please try again.".to_string(),
            });
        }
        if !status.is_success() {
            return Err(remote_error(response, "OTP verification failed").await);
        }

        let body: AuthResponse = response.json().await?;
        match (body.token, body.user) {
            (Some(token), Some(user)) => Ok(AuthSession { token, user }),
            _ => Err(AppError::InvalidResponse(
                "verification succeeded but token or user is missing".to_string(),
            )),
        }
    }

    /// Register a new account for `email`.
    pub async fn register(&self, email: &str) -> Result<AuthResponse> {
        self.require_institutional(email)?;

        let response = self
            .http
            .post(format!("{}/auth/register", self.base_url))
            .json(&json!({ "email": email }))
            .send()
            .await?;

        parse_json(response, "Registration failed").await
    }

    /// The full materials listing.
    pub async fn fetch_materials(&self) -> Result<Vec<Material>> {
        let response = self
            .http
            .get(format!("{}/materials", self.base_url))
            .send()
            .await?;

        parse_json(response, "Failed to fetch materials").await
    }

    /// A single material by id.
    pub async fn get_material(&self, id: &str) -> Result<Material> {
        let response = self
            .http
            .get(format!("{}/materials/{}", self.base_url, id))
            .send()
            .await?;

        parse_json(response, "Failed to fetch material").await
    }

    /// Download a material's file.
    pub async fn download_material(&self, id: &str, token: &str) -> Result<DownloadedFile> {
        let response = self
            .http
            .get(format!("{}/materials/{}", self.base_url, id))
            .bearer_auth(token)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(remote_error(response, "Failed to download material").await);
        }

        let filename = response
            .headers()
            .get(reqwest::header::CONTENT_DISPOSITION)
            .and_then(|v| v.to_str().ok())
            .and_then(filename_from_content_disposition)
            .unwrap_or_else(|| "document.pdf".to_string());

        let bytes = response.bytes().await?.to_vec();

        Ok(DownloadedFile { filename, bytes })
    }

    /// Upload a material as multipart form data.
    pub async fn upload_material(&self, upload: MaterialUpload, token: &str) -> Result<Material> {
        if token.is_empty() {
            return Err(AppError::Validation(
                "Authentication token is required".to_string(),
            ));
        }
        if upload.level.is_empty()
            || upload.course_code.is_empty()
            || upload.course_title.is_empty()
            || upload.description.is_empty()
            || upload.file_name.is_empty()
        {
            return Err(AppError::Validation("Missing required fields".to_string()));
        }

        let form = Form::new()
            .part(
                "material",
                Part::bytes(upload.contents).file_name(upload.file_name),
            )
            .text("level", upload.level)
            .text("courseCode", upload.course_code)
            .text("courseTitle", upload.course_title)
            .text("description", upload.description);

        let response = self
            .http
            .post(format!("{}/materials", self.base_url))
            .bearer_auth(token)
            .multipart(form)
            .send()
            .await?;

        parse_json(response, "Upload failed").await
    }
}

/// Whether `email` belongs to the institution.
pub(crate) fn is_institutional_email(email: &str, domain: &str) -> bool {
    email
        .to_lowercase()
        .ends_with(&format!("@{}", domain.to_lowercase()))
}

/// Extract the filename from a `content-disposition` header value.
pub(crate) fn filename_from_content_disposition(value: &str) -> Option<String> {
    let filename = value.split("filename=").nth(1)?;
    let filename: String = filename
        .chars()
        .filter(|c| *c != '"' && *c != '\'')
        .collect();

    let filename = filename.trim();
    if filename.is_empty() {
        None
    } else {
        Some(filename.to_string())
    }
}

async fn remote_error(response: reqwest::Response, fallback: &str) -> AppError {
    let status = response.status().as_u16();
    let message = response
        .json::<ErrorBody>()
        .await
        .ok()
        .and_then(|body| body.message)
        .unwrap_or_else(|| fallback.to_string());

    AppError::Remote { status, message }
}

async fn parse_json<T: serde::de::DeserializeOwned>(
    response: reqwest::Response,
    fallback: &str,
) -> Result<T> {
    if !response.status().is_success() {
        return Err(remote_error(response, fallback).await);
    }

    Ok(response.json().await?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_institutional_email() {
        assert!(is_institutional_email("jane@uniport.edu.ng", "uniport.edu.ng"));
        assert!(is_institutional_email("JANE@UNIPORT.EDU.NG", "uniport.edu.ng"));
        assert!(!is_institutional_email("jane@gmail.com", "uniport.edu.ng"));
        assert!(!is_institutional_email("uniport.edu.ng", "uniport.edu.ng"));
    }

    #[tokio::test]
    async fn test_otp_request_rejects_foreign_email_before_any_call() {
        let client = ApiClient::new("http://localhost:0", "uniport.edu.ng");

        let result = client.request_otp("jane@gmail.com").await;
        assert!(matches!(result, Err(AppError::Validation(_))));
    }

    #[tokio::test]
    async fn test_upload_validation_happens_before_any_call() {
        let client = ApiClient::new("http://localhost:0", "uniport.edu.ng");
        let upload = MaterialUpload {
            level: "200".to_string(),
            course_code: "CSC280".to_string(),
            course_title: "Algorithms".to_string(),
            description: "Lecture notes".to_string(),
            file_name: "notes.pdf".to_string(),
            contents: vec![1, 2, 3],
        };

        let result = client.upload_material(upload.clone(), "").await;
        assert!(matches!(result, Err(AppError::Validation(_))));

        let incomplete = MaterialUpload {
            course_title: String::new(),
            ..upload
        };
        let result = client.upload_material(incomplete, "token").await;
        assert!(matches!(result, Err(AppError::Validation(_))));
    }

    #[test]
    fn test_filename_from_content_disposition() {
        assert_eq!(
            filename_from_content_disposition(r#"attachment; filename="notes.pdf""#),
            Some("notes.pdf".to_string())
        );
        assert_eq!(
            filename_from_content_disposition("attachment; filename=plain.pdf"),
            Some("plain.pdf".to_string())
        );
        assert_eq!(filename_from_content_disposition("attachment"), None);
        assert_eq!(filename_from_content_disposition(r#"filename="""#), None);
    }
}
