use std::time::Duration;

use async_trait::async_trait;
use reqwest::multipart;
use serde_json::Value;
use tracing::{debug, warn};

use crate::domain::{
    error::GatewayError,
    gateway::{
        EmailStatus, EventId, ParticipationOutcome, RegisterOutcome, RegistrationPayload,
        RemoteGateway, ResendOutcome, UserId, VerifyOutcome,
    },
    models::catalog::{AboutSection, CarouselItem, CatalogEnvelope, Event},
    services::validation::ValidationErrorMap,
};

// Literal outcome strings the backend emits for registration conflicts.
// These are an external contract: classification is by message text, not
// HTTP status, and must track the backend verbatim.
const MSG_UNVERIFIED_RESENT: &str = "Email not verified. Verification code resent.";
const MSG_ALREADY_VERIFIED: &str = "Email already registered and verified.";
const MSG_PHONE_IN_USE: &str = "Phone number already in use.";

#[derive(Debug, Clone)]
pub struct GatewayConfig {
    /// Origin of the portal backend, e.g. `https://portal.example.edu`.
    pub base_url: String,
    /// Bound for lightweight JSON lookups.
    pub lookup_timeout: Duration,
    /// Bound for the multipart registration submission.
    pub submit_timeout: Duration,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8000".to_string(),
            lookup_timeout: Duration::from_secs(10),
            submit_timeout: Duration::from_secs(30),
        }
    }
}

impl GatewayConfig {
    pub fn with_base_url(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            ..Self::default()
        }
    }
}

/// Production gateway speaking HTTP to the portal backend.
#[derive(Clone)]
pub struct HttpRemoteGateway {
    config: GatewayConfig,
    client: reqwest::Client,
}

impl HttpRemoteGateway {
    pub fn new(config: GatewayConfig) -> Self {
        let client = reqwest::Client::builder()
            .build()
            .expect("failed to build HTTP client");
        Self { config, client }
    }

    pub fn base_url(&self) -> &str {
        &self.config.base_url
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/api/{}", self.config.base_url.trim_end_matches('/'), path)
    }

    async fn get_json(&self, path: &str, query: &[(&str, String)]) -> Result<Response, GatewayError> {
        let url = self.endpoint(path);
        debug!(%url, "GET");
        let response = self
            .client
            .get(&url)
            .query(query)
            .header(reqwest::header::ACCEPT, "application/json")
            .timeout(self.config.lookup_timeout)
            .send()
            .await
            .map_err(transport_error)?;
        Response::read(response).await
    }

    async fn post_json(&self, path: &str, body: Value) -> Result<Response, GatewayError> {
        let url = self.endpoint(path);
        debug!(%url, "POST");
        let response = self
            .client
            .post(&url)
            .header(reqwest::header::ACCEPT, "application/json")
            .json(&body)
            .timeout(self.config.lookup_timeout)
            .send()
            .await
            .map_err(transport_error)?;
        Response::read(response).await
    }

    async fn fetch_catalog<T: serde::de::DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, String)],
    ) -> Result<Vec<T>, GatewayError> {
        let response = self.get_json(path, query).await?;
        let body = response.json()?;
        let envelope: CatalogEnvelope<T> = serde_json::from_value(body)
            .map_err(|e| GatewayError::Protocol(format!("unexpected catalog shape: {e}")))?;
        Ok(envelope.data)
    }

    fn multipart_form(payload: &RegistrationPayload) -> Result<multipart::Form, GatewayError> {
        let mut form = multipart::Form::new()
            .text("user_type", payload.user_type.as_str())
            .text("full_name", payload.full_name.clone())
            .text("email", payload.email.clone())
            .text("password", payload.password.clone())
            .text("country", payload.country.clone())
            .text("state", payload.state.clone())
            .text("city", payload.city.clone())
            .text("address", payload.address.clone())
            .text("phone", payload.phone.clone())
            .text("introduction", payload.introduction.clone())
            .text("agree_terms", if payload.agree_terms { "true" } else { "false" });

        if let Some(gender) = payload.gender {
            form = form.text("gender", gender.as_str());
        }
        if let Some(team_name) = &payload.team_name {
            form = form.text("team_name", team_name.clone());
        }
        if let Some(dob) = payload.date_of_birth {
            form = form.text("date_of_birth", dob.format("%Y-%m-%d").to_string());
        }

        // Array fields travel JSON-encoded inside the multipart body.
        for (field, list) in [
            ("talent_scope", &payload.talent_scope),
            ("social_media_links", &payload.social_media_links),
            ("additional_links", &payload.additional_links),
            ("portfolio_links", &payload.portfolio_links),
        ] {
            let encoded = serde_json::to_string(list)
                .map_err(|e| GatewayError::Protocol(format!("encoding {field}: {e}")))?;
            form = form.text(field, encoded);
        }

        if let Some(image) = &payload.profile_image {
            form = form.part("profile_image", file_part(image)?);
        }
        for (kind, file) in &payload.certificates {
            form = form.part(kind.field_name(), file_part(file)?);
        }

        Ok(form)
    }
}

fn file_part(file: &crate::domain::models::form::FileAttachment) -> Result<multipart::Part, GatewayError> {
    multipart::Part::bytes(file.bytes.clone())
        .file_name(file.file_name.clone())
        .mime_str(&file.mime_type)
        .map_err(|e| GatewayError::Protocol(format!("invalid attachment type: {e}")))
}

#[async_trait]
impl RemoteGateway for HttpRemoteGateway {
    async fn check_email_status(&self, email: &str) -> Result<EmailStatus, GatewayError> {
        let response = self
            .post_json("check-email-status/", serde_json::json!({ "email": email }))
            .await?;
        let body = response.json()?;
        serde_json::from_value(body)
            .map_err(|e| GatewayError::Protocol(format!("unexpected status shape: {e}")))
    }

    async fn lookup_user_id(&self, email: &str) -> Result<Option<UserId>, GatewayError> {
        let response = self
            .get_json("get-userid/", &[("email", email.to_string())])
            .await?;
        if response.status == 404 {
            return Ok(None);
        }
        let body = response.json()?;
        if !response.is_success() {
            let message = extract_message(&body)
                .unwrap_or_else(|| format!("Lookup failed ({})", response.status));
            return Err(GatewayError::Server(message));
        }
        let user_id = body
            .get("user_id")
            .and_then(Value::as_i64)
            .ok_or_else(|| GatewayError::Protocol("missing user_id in response".to_string()))?;
        Ok(Some(user_id))
    }

    async fn register(
        &self,
        payload: &RegistrationPayload,
    ) -> Result<RegisterOutcome, GatewayError> {
        let url = self.endpoint("reg-user/");
        debug!(%url, "POST multipart");
        // Content-Type is left to the multipart encoder (boundary included).
        let response = self
            .client
            .post(&url)
            .header(reqwest::header::ACCEPT, "application/json")
            .multipart(Self::multipart_form(payload)?)
            .timeout(self.config.submit_timeout)
            .send()
            .await
            .map_err(transport_error)?;
        let response = Response::read(response).await?;
        let body = response.json()?;
        Ok(classify_register_response(
            response.status,
            &body,
            &payload.email,
        ))
    }

    async fn verify_email(&self, email: &str, code: &str) -> Result<VerifyOutcome, GatewayError> {
        let response = self
            .post_json("verify-email/", serde_json::json!({ "email": email, "code": code }))
            .await?;
        // Success and rejection alike must arrive as JSON; an HTML page
        // here is a protocol failure, not a backend verdict.
        let body = response.json()?;
        if response.is_success() {
            Ok(VerifyOutcome::Verified)
        } else {
            let message = extract_message(&body)
                .unwrap_or_else(|| "Verification failed. Please try again.".to_string());
            Ok(VerifyOutcome::Rejected { message })
        }
    }

    async fn resend_otp(&self, email: &str) -> Result<ResendOutcome, GatewayError> {
        let response = self
            .post_json("resend-email-otp/", serde_json::json!({ "email": email }))
            .await?;
        let body = response.json()?;
        if response.is_success() {
            Ok(ResendOutcome::Sent)
        } else {
            let message = extract_message(&body)
                .unwrap_or_else(|| "Could not resend the code. Please try again.".to_string());
            Ok(ResendOutcome::Rejected { message })
        }
    }

    async fn register_for_event(
        &self,
        event_id: EventId,
        user_id: UserId,
    ) -> Result<ParticipationOutcome, GatewayError> {
        let response = self
            .post_json(
                "event-participant/",
                serde_json::json!({ "event_id": event_id, "user_id": user_id }),
            )
            .await?;
        let body = response.json()?;
        if response.is_success() {
            Ok(ParticipationOutcome::Registered)
        } else {
            let message = extract_message(&body)
                .unwrap_or_else(|| "Event registration failed.".to_string());
            Ok(ParticipationOutcome::Rejected { message })
        }
    }

    async fn list_events(&self) -> Result<Vec<Event>, GatewayError> {
        self.fetch_catalog("event-item/", &[]).await
    }

    async fn list_carousel_items(&self) -> Result<Vec<CarouselItem>, GatewayError> {
        self.fetch_catalog("carousel1-item/", &[]).await
    }

    async fn about_us(&self, id: i64) -> Result<Vec<AboutSection>, GatewayError> {
        self.fetch_catalog("aboutus-item/", &[("id", id.to_string())]).await
    }
}

/// A buffered backend response: status plus raw body text. Parsing is
/// deferred so callers can branch on status before insisting on JSON.
struct Response {
    status: u16,
    body: String,
}

impl Response {
    async fn read(response: reqwest::Response) -> Result<Self, GatewayError> {
        let status = response.status().as_u16();
        let body = response.text().await.map_err(transport_error)?;
        Ok(Self { status, body })
    }

    fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Parse the body as JSON. An HTML error page (reverse proxy, crashed
    /// backend) surfaces as a protocol error with a legible message.
    fn json(&self) -> Result<Value, GatewayError> {
        serde_json::from_str(&self.body).map_err(|_| {
            warn!(status = self.status, "non-JSON response body");
            GatewayError::Protocol(
                "The server sent an unreadable response. Please try again later.".to_string(),
            )
        })
    }
}

fn transport_error(error: reqwest::Error) -> GatewayError {
    if error.is_timeout() {
        GatewayError::Timeout
    } else if error.is_connect() {
        GatewayError::Network(error.to_string())
    } else if error.is_decode() {
        GatewayError::Protocol(error.to_string())
    } else {
        GatewayError::Network(error.to_string())
    }
}

/// Pull a display message out of the backend's loosely shaped error
/// bodies: sometimes `message`, sometimes `error`, sometimes `detail`.
fn extract_message(body: &Value) -> Option<String> {
    for key in ["message", "error", "detail"] {
        if let Some(text) = body.get(key).and_then(Value::as_str) {
            return Some(text.to_string());
        }
    }
    None
}

/// Collect candidate outcome strings from an error body: the message
/// keys plus the `email`/`phone` field keys (string or list-of-strings).
fn candidate_strings(body: &Value) -> Vec<String> {
    let mut out = Vec::new();
    for key in ["message", "error", "detail", "email", "phone"] {
        match body.get(key) {
            Some(Value::String(s)) => out.push(s.clone()),
            Some(Value::Array(items)) => {
                out.extend(items.iter().filter_map(Value::as_str).map(str::to_string))
            }
            _ => {}
        }
    }
    out
}

/// Classify a registration response.
///
/// External contract quirk: the backend signals conflicts by literal
/// message strings (sometimes under `message`, sometimes under the
/// `email`/`phone` field keys) rather than by status code, so matching
/// on those strings is required for compatibility.
fn classify_register_response(status: u16, body: &Value, submitted_email: &str) -> RegisterOutcome {
    if (200..300).contains(&status) {
        let registered_email = body
            .get("email")
            .and_then(Value::as_str)
            .unwrap_or(submitted_email)
            .to_string();
        return RegisterOutcome::Registered { registered_email };
    }

    for text in candidate_strings(body) {
        if text == MSG_UNVERIFIED_RESENT {
            return RegisterOutcome::AlreadyRegisteredUnverified { message: text };
        }
        if text == MSG_ALREADY_VERIFIED {
            return RegisterOutcome::AlreadyRegisteredVerified { message: text };
        }
        if text == MSG_PHONE_IN_USE {
            return RegisterOutcome::PhoneInUse { message: text };
        }
    }

    if let Some(errors) = server_field_errors(body) {
        return RegisterOutcome::FieldErrors(errors);
    }

    let message = extract_message(body)
        .unwrap_or_else(|| format!("Registration failed ({status}). Please try again."));
    RegisterOutcome::Rejected { message }
}

/// Fold the backend's per-field error shapes into a `ValidationErrorMap`:
/// `{errors: {field: [...]}}`, or field-named keys at the top level such
/// as `{user_type: [...]}` and `{non_field_errors: [...]}`.
fn server_field_errors(body: &Value) -> Option<ValidationErrorMap> {
    let mut map = ValidationErrorMap::new();

    let (fields, nested) = match body.get("errors") {
        Some(Value::Object(inner)) => (Some(inner), true),
        _ => (body.as_object(), false),
    };
    let fields = fields?;

    for (field, value) in fields {
        // Top-level message keys are display messages, not field names.
        if !nested && matches!(field.as_str(), "message" | "error" | "detail") {
            continue;
        }
        let message = match value {
            Value::String(s) => Some(s.clone()),
            Value::Array(items) => {
                let joined: Vec<&str> = items.iter().filter_map(Value::as_str).collect();
                (!joined.is_empty()).then(|| joined.join(" "))
            }
            _ => None,
        };
        if let Some(message) = message {
            map.message(field, message);
        }
    }

    (!map.is_empty()).then_some(map)
}
