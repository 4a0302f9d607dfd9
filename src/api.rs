use std::time::Duration;

use ::url::Url;
use reqwest::header::COOKIE;
use reqwest::StatusCode;
use serde::Deserialize;
use thiserror::Error;
use tracing::{debug, warn};

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("unauthorized: {0}")]
    Unauthorized(String),
    #[error("not found: {0}")]
    NotFound(String),
    #[error("server returned {status}: {message}")]
    Status { status: u16, message: String },
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),
    #[error("failed to decode response: {0}")]
    Decode(#[from] serde_json::Error),
    #[error("api base {0} cannot carry a path")]
    InvalidBase(Url),
}

impl ApiError {
    /// Message suitable for showing to the user: the server's own message
    /// when it sent one.
    pub fn user_message(&self) -> String {
        match self {
            ApiError::Unauthorized(message)
            | ApiError::NotFound(message)
            | ApiError::Status { message, .. } => message.clone(),
            other => other.to_string(),
        }
    }
}

/// Session credentials forwarded to the project service as a cookie.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    cookie: String,
}

impl Session {
    pub fn from_token(cookie_name: &str, token: &str) -> Self {
        Self {
            cookie: format!("{cookie_name}={token}"),
        }
    }

    /// Reuse a raw `Cookie` header, as received by the preview server.
    pub fn from_cookie_header(header: &str) -> Option<Self> {
        let trimmed = header.trim();
        if trimmed.is_empty() {
            return None;
        }
        Some(Self {
            cookie: trimmed.to_string(),
        })
    }

    pub fn cookie_header(&self) -> &str {
        &self.cookie
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Version {
    pub id: String,
    #[serde(default)]
    pub code: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ProjectPreview {
    #[serde(default)]
    pub current_code: Option<String>,
    #[serde(default)]
    pub versions: Vec<Version>,
}

impl ProjectPreview {
    pub fn has_version(&self, version_id: &str) -> bool {
        self.versions.iter().any(|version| version.id == version_id)
    }

    /// Markup to preview: the matching version when one is requested and
    /// known, the project's current code otherwise.
    pub fn document_for(&self, version_id: Option<&str>) -> &str {
        version_id
            .and_then(|id| self.versions.iter().find(|version| version.id == id))
            .map(|version| version.code.as_str())
            .unwrap_or_else(|| self.current_code.as_deref().unwrap_or_default())
    }
}

#[derive(Deserialize)]
struct PreviewResponse {
    project: ProjectPreview,
}

#[derive(Deserialize)]
struct ErrorBody {
    message: Option<String>,
}

/// Client for the project service.
#[derive(Clone)]
pub struct ProjectClient {
    http: reqwest::Client,
    api_base: Url,
}

impl ProjectClient {
    pub fn new(api_base: Url) -> Result<Self, ApiError> {
        if api_base.cannot_be_a_base() {
            return Err(ApiError::InvalidBase(api_base));
        }
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(10))
            .build()?;
        Ok(Self { http, api_base })
    }

    pub fn api_base(&self) -> &Url {
        &self.api_base
    }

    pub fn preview_url(&self, project_id: &str) -> Result<Url, ApiError> {
        let mut url = self.api_base.clone();
        url.path_segments_mut()
            .map_err(|_| ApiError::InvalidBase(self.api_base.clone()))?
            .pop_if_empty()
            .extend(["api", "project", "preview", project_id]);
        Ok(url)
    }

    /// `GET /api/project/preview/{id}`.
    pub async fn fetch_preview(
        &self,
        project_id: &str,
        session: &Session,
    ) -> Result<ProjectPreview, ApiError> {
        let url = self.preview_url(project_id)?;
        debug!(target = "api", %url, "fetching project preview");

        let response = self
            .http
            .get(url)
            .header(COOKIE, session.cookie_header())
            .send()
            .await?;
        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            let message = serde_json::from_str::<ErrorBody>(&body)
                .ok()
                .and_then(|parsed| parsed.message)
                .unwrap_or_else(|| {
                    status
                        .canonical_reason()
                        .unwrap_or("request failed")
                        .to_string()
                });
            warn!(target = "api", status = status.as_u16(), %message, "project preview request failed");
            return Err(match status {
                StatusCode::UNAUTHORIZED => ApiError::Unauthorized(message),
                StatusCode::NOT_FOUND => ApiError::NotFound(message),
                _ => ApiError::Status {
                    status: status.as_u16(),
                    message,
                },
            });
        }

        let parsed: PreviewResponse = serde_json::from_str(&body)?;
        Ok(parsed.project)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn project() -> ProjectPreview {
        serde_json::from_str::<PreviewResponse>(
            r#"{"project":{"current_code":"<p>now</p>","versions":[{"id":"v1","code":"<p>then</p>"}],"name":"ignored"}}"#,
        )
        .unwrap()
        .project
    }

    #[test]
    fn version_overrides_current_code() {
        let project = project();
        assert_eq!(project.document_for(None), "<p>now</p>");
        assert_eq!(project.document_for(Some("v1")), "<p>then</p>");
        assert_eq!(project.document_for(Some("v9")), "<p>now</p>");
    }

    #[test]
    fn missing_code_is_empty() {
        let project: ProjectPreview = serde_json::from_str(r#"{"current_code":null}"#).unwrap();
        assert_eq!(project.document_for(None), "");
    }

    #[test]
    fn preview_url_escapes_ids() {
        let client = ProjectClient::new(Url::parse("http://localhost:3001/base/").unwrap()).unwrap();
        assert_eq!(
            client.preview_url("a b/c").unwrap().as_str(),
            "http://localhost:3001/base/api/project/preview/a%20b%2Fc"
        );
    }

    #[test]
    fn user_message_prefers_server_text() {
        assert_eq!(
            ApiError::Unauthorized("Unauthorized user".into()).user_message(),
            "Unauthorized user"
        );
        assert_eq!(
            ApiError::Status {
                status: 500,
                message: "boom".into()
            }
            .user_message(),
            "boom"
        );
    }

    #[test]
    fn sessions_render_as_cookies() {
        let session = Session::from_token("better-auth.session_token", "abc");
        assert_eq!(session.cookie_header(), "better-auth.session_token=abc");
        assert_eq!(Session::from_cookie_header("  "), None);
    }
}
