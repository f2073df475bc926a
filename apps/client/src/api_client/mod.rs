//! Fursa API client: the single point of entry for every call to the Fursa REST API.
//!
//! Each operation is one round trip, guarded by a local precondition check
//! (token held, profile id known, resume attached) that fails before any I/O.
//! Failures are returned once; nothing here retries.
use std::collections::BTreeMap;
use std::sync::Arc;

use bytes::Bytes;
use reqwest::{Client, Method, StatusCode};
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::{debug, info, warn};

pub mod body;

pub use body::{Attachment, FormPart, RequestBody};

use crate::config::{Config, LoginField};
use crate::errors::ClientError;
use crate::models::auth::{LoginResponse, MessageResponse};
use crate::models::{
    Application, Credentials, JobListing, Profile, ProfileUpdate, RegisterRequest, Skill,
};
use crate::session::{FileTokenStore, Session, TokenStore};

const LOGIN_PATH: &str = "/login/";
const REGISTER_PATH: &str = "/register/";
const PROFILES_PATH: &str = "/profiles/";
const SKILLS_PATH: &str = "/skills/";
const JOBS_PATH: &str = "/jobs/";
const APPLICATIONS_PATH: &str = "/applications/";

/// Keys a server error payload may carry its human-readable reason under.
const MESSAGE_KEYS: &[&str] = &["error", "detail", "message"];

pub struct FursaClient {
    http: Client,
    base_url: String,
    login_field: LoginField,
    session: Session,
    profile_id: Option<i64>,
}

impl FursaClient {
    /// Builds a client whose token lives in the file named by `config.token_path`.
    pub async fn connect(config: &Config) -> Result<Self, ClientError> {
        let store = Arc::new(FileTokenStore::new(&config.token_path));
        Self::with_store(config, store).await
    }

    /// Builds a client over any token store, restoring a persisted session if present.
    pub async fn with_store(
        config: &Config,
        store: Arc<dyn TokenStore>,
    ) -> Result<Self, ClientError> {
        let mut builder = Client::builder();
        if let Some(timeout) = config.http_timeout {
            builder = builder.timeout(timeout);
        }

        Ok(Self {
            http: builder.build()?,
            base_url: crate::config::normalize_base_url(&config.api_base_url),
            login_field: config.login_field,
            session: Session::init(store).await?,
            profile_id: None,
        })
    }

    pub fn is_authenticated(&self) -> bool {
        self.session.is_authenticated()
    }

    /// Profile id learned from the last successful `fetch_profile`.
    pub fn profile_id(&self) -> Option<i64> {
        self.profile_id
    }

    // ── session ────────────────────────────────────────────────────────────

    /// POST /login/. Stores the returned token on success.
    pub async fn login(&mut self, credentials: &Credentials) -> Result<&Session, ClientError> {
        let mut payload = serde_json::Map::new();
        payload.insert(
            self.login_field.as_str().to_string(),
            Value::String(credentials.identifier.clone()),
        );
        payload.insert(
            "password".to_string(),
            Value::String(credentials.password.clone()),
        );

        let body = RequestBody::json(Value::Object(payload));
        let (_, raw) = self
            .execute(Method::POST, LOGIN_PATH, None, Some(body))
            .await
            .map_err(|e| match e {
                ClientError::Validation { message, .. } => ClientError::Authentication(message),
                other => other,
            })?;

        let response: LoginResponse = serde_json::from_slice(&raw)?;
        if response.access_token.trim().is_empty() {
            return Err(ClientError::Authentication(
                "Server returned an empty token".to_string(),
            ));
        }

        self.session.set_token(response.access_token).await?;
        self.profile_id = None;
        info!(
            "Logged in as {} ({})",
            credentials.identifier,
            response.message.as_deref().unwrap_or("ok")
        );
        Ok(&self.session)
    }

    /// Clears the stored token; protected calls fail locally afterwards.
    pub async fn logout(&mut self) -> Result<(), ClientError> {
        self.profile_id = None;
        self.session.teardown().await?;
        info!("Logged out");
        Ok(())
    }

    /// POST /register/. Returns the server's confirmation message.
    pub async fn register(&self, request: &RegisterRequest) -> Result<String, ClientError> {
        let payload = serde_json::to_value(request)?;
        let (_, raw) = self
            .execute(Method::POST, REGISTER_PATH, None, Some(RequestBody::json(payload)))
            .await?;

        let message = serde_json::from_slice::<MessageResponse>(&raw)
            .ok()
            .and_then(|m| m.message)
            .unwrap_or_else(|| "Account created successfully!".to_string());
        info!("Registered account {}", request.email);
        Ok(message)
    }

    // ── profile ────────────────────────────────────────────────────────────

    /// GET /profiles/{id}/ when the id is known, otherwise the caller-scoped
    /// GET /profiles/ listing. Remembers the profile id for later updates.
    pub async fn fetch_profile(&mut self) -> Result<Profile, ClientError> {
        let token = self.session.require_token()?;

        let profile = match self.profile_id {
            Some(id) => self.get_json::<Profile>(&profile_path(id), Some(token)).await?,
            None => self
                .get_json::<Vec<Profile>>(PROFILES_PATH, Some(token))
                .await?
                .into_iter()
                .next()
                .ok_or_else(|| {
                    ClientError::NotFound("No profile exists for this account".to_string())
                })?,
        };

        self.profile_id = Some(profile.id);
        Ok(profile)
    }

    /// PATCH /profiles/{id}/ as JSON, or multipart when an image or resume is attached.
    pub async fn update_profile(
        &mut self,
        update: &ProfileUpdate,
        profile_image: Option<Attachment>,
        resume: Option<Attachment>,
    ) -> Result<Profile, ClientError> {
        let token = self.session.require_token()?;
        if update.is_empty() && profile_image.is_none() && resume.is_none() {
            return Err(nothing_to_update());
        }
        let id = self.profile_id.ok_or(ClientError::MissingProfileId)?;

        let body = RequestBody::profile_update(update, profile_image, resume)?;
        let multipart = body.is_multipart();
        let (_, raw) = self
            .execute(Method::PATCH, &profile_path(id), Some(token), Some(body))
            .await?;

        let profile: Profile = serde_json::from_slice(&raw)?;
        info!("Profile {} updated (multipart={multipart})", profile.id);
        Ok(profile)
    }

    // ── catalog ────────────────────────────────────────────────────────────

    /// GET /skills/. No token needed.
    pub async fn fetch_skills_catalog(&self) -> Result<Vec<Skill>, ClientError> {
        self.get_json(SKILLS_PATH, None).await
    }

    /// GET /jobs/. No token needed.
    pub async fn fetch_jobs(&self) -> Result<Vec<JobListing>, ClientError> {
        self.get_json(JOBS_PATH, None).await
    }

    /// Looks a single job up in the public listing; the API has no detail route.
    pub async fn fetch_job(&self, job_id: i64) -> Result<JobListing, ClientError> {
        self.fetch_jobs()
            .await?
            .into_iter()
            .find(|j| j.id == job_id)
            .ok_or_else(|| ClientError::NotFound(format!("Job {job_id} not found")))
    }

    // ── applications ───────────────────────────────────────────────────────

    /// POST /applications/ (multipart). Fails with `MissingResume` before any
    /// request when no non-empty resume is attached.
    pub async fn submit_application(
        &self,
        job_id: i64,
        cover_letter: &str,
        resume: Option<Attachment>,
    ) -> Result<Application, ClientError> {
        let token = self.session.require_token()?;
        let resume = resume
            .filter(|r| !r.is_empty())
            .ok_or(ClientError::MissingResume)?;

        let body = RequestBody::application(job_id, cover_letter, resume);
        let (status, raw) = self
            .execute(Method::POST, APPLICATIONS_PATH, Some(token), Some(body))
            .await?;

        let value: Value = serde_json::from_slice(&raw)?;
        if value.get("id").is_none() {
            if let Some(message) = value.get("message").and_then(|m| m.as_str()) {
                debug!("Application to job {job_id} not created ({status}): {message}");
                return Err(ClientError::AlreadyApplied(message.to_string()));
            }
        }

        let application: Application = serde_json::from_value(value)?;
        info!("Applied to job {job_id} (application {})", application.id);
        Ok(application)
    }

    /// GET /applications/: the caller's own applications.
    pub async fn fetch_applications(&self) -> Result<Vec<Application>, ClientError> {
        let token = self.session.require_token()?;
        self.get_json(APPLICATIONS_PATH, Some(token)).await
    }

    // ── transport ──────────────────────────────────────────────────────────

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        token: Option<&str>,
    ) -> Result<T, ClientError> {
        let (_, raw) = self.execute(Method::GET, path, token, None).await?;
        Ok(serde_json::from_slice(&raw)?)
    }

    /// Sends one request and returns the raw body of a 2xx response.
    /// Non-2xx responses are decoded into the matching `ClientError`.
    async fn execute(
        &self,
        method: Method,
        path: &str,
        token: Option<&str>,
        body: Option<RequestBody>,
    ) -> Result<(StatusCode, Bytes), ClientError> {
        let mut builder = self
            .http
            .request(method.clone(), self.url(path))
            .header(reqwest::header::ACCEPT, "application/json");
        if let Some(token) = token {
            builder = builder.bearer_auth(token);
        }
        if let Some(body) = body {
            builder = body.apply(builder)?;
        }

        debug!("{method} {path}");
        let response = builder.send().await?;
        let status = response.status();
        let raw = response.bytes().await?;

        if !status.is_success() {
            warn!("{method} {path} returned {status}");
            return Err(error_from_response(status, &raw, token.is_some()));
        }

        Ok((status, raw))
    }
}

fn profile_path(id: i64) -> String {
    format!("{PROFILES_PATH}{id}/")
}

fn nothing_to_update() -> ClientError {
    ClientError::Validation {
        message: "Nothing to update: change a field or attach a file.".to_string(),
        fields: BTreeMap::new(),
    }
}

/// Maps a non-2xx response to an error carrying the server's own reason.
/// A 401/403 on a call that sent a token means the session itself was refused.
pub(crate) fn error_from_response(
    status: StatusCode,
    raw: &[u8],
    sent_token: bool,
) -> ClientError {
    let (message, fields) = extract_server_message(status, raw);
    match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN if sent_token => {
            ClientError::SessionRejected(message)
        }
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => ClientError::Authentication(message),
        StatusCode::BAD_REQUEST | StatusCode::UNPROCESSABLE_ENTITY => {
            ClientError::Validation { message, fields }
        }
        StatusCode::NOT_FOUND => ClientError::NotFound(message),
        _ => ClientError::Server {
            status: status.as_u16(),
            message,
        },
    }
}

/// Server payloads come as `{"error": ..}`, `{"detail": ..}`, `{"message": ..}`
/// or a field map `{"email": ["Email already exists."]}`.
fn extract_server_message(
    status: StatusCode,
    raw: &[u8],
) -> (String, BTreeMap<String, Vec<String>>) {
    let mut fields = BTreeMap::new();

    let Ok(Value::Object(map)) = serde_json::from_slice::<Value>(raw) else {
        let text = String::from_utf8_lossy(raw).trim().to_string();
        let message = if text.is_empty() {
            status
                .canonical_reason()
                .unwrap_or("Request failed")
                .to_string()
        } else {
            text
        };
        return (message, fields);
    };

    for key in MESSAGE_KEYS {
        if let Some(msg) = map.get(*key).and_then(|v| v.as_str()) {
            return (msg.to_string(), fields);
        }
    }

    for (field, value) in &map {
        let messages = match value {
            Value::String(s) => vec![s.clone()],
            Value::Array(items) => items
                .iter()
                .map(|i| match i {
                    Value::String(s) => s.clone(),
                    other => other.to_string(),
                })
                .collect(),
            other => vec![other.to_string()],
        };
        fields.insert(field.clone(), messages);
    }

    let message = if fields.is_empty() {
        status
            .canonical_reason()
            .unwrap_or("Request failed")
            .to_string()
    } else {
        fields
            .iter()
            .map(|(field, msgs)| format!("{field}: {}", msgs.join(" ")))
            .collect::<Vec<_>>()
            .join("; ")
    };

    (message, fields)
}
