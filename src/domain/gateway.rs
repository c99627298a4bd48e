use async_trait::async_trait;
use chrono::NaiveDate;
use serde::Deserialize;

use crate::domain::{
    error::GatewayError,
    models::catalog::{AboutSection, CarouselItem, Event},
    models::form::{CertificateKind, FileAttachment, Gender, RegistrationForm, UserType},
    services::validation::ValidationErrorMap,
};

pub type UserId = i64;
pub type EventId = i64;

/// Advisory result of the email pre-check.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct EmailStatus {
    #[serde(default)]
    pub registered: bool,
    #[serde(default)]
    pub verified: bool,
}

/// Classified outcome of a registration submission.
///
/// The backend signals most of these through literal message strings
/// rather than status codes; the gateway implementation owns that
/// mapping so callers only ever see this enum.
#[derive(Debug, Clone, PartialEq)]
pub enum RegisterOutcome {
    Registered { registered_email: String },
    AlreadyRegisteredUnverified { message: String },
    AlreadyRegisteredVerified { message: String },
    PhoneInUse { message: String },
    FieldErrors(ValidationErrorMap),
    Rejected { message: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VerifyOutcome {
    Verified,
    Rejected { message: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResendOutcome {
    Sent,
    Rejected { message: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParticipationOutcome {
    Registered,
    Rejected { message: String },
}

/// The multipart body for one registration submission, assembled from a
/// validated form. Only fields applicable to the chosen account type are
/// present, link lists keep their non-blank entries only, and files are
/// carried for currently selected certificate kinds alone.
#[derive(Debug, Clone)]
pub struct RegistrationPayload {
    pub user_type: UserType,
    pub team_name: Option<String>,
    pub full_name: String,
    pub gender: Option<Gender>,
    pub email: String,
    pub password: String,
    pub date_of_birth: Option<NaiveDate>,
    pub country: String,
    pub state: String,
    pub city: String,
    pub address: String,
    pub phone: String,
    pub introduction: String,
    pub talent_scope: Vec<String>,
    pub social_media_links: Vec<String>,
    pub additional_links: Vec<String>,
    pub portfolio_links: Vec<String>,
    pub profile_image: Option<FileAttachment>,
    pub certificates: Vec<(CertificateKind, FileAttachment)>,
    pub agree_terms: bool,
}

impl RegistrationPayload {
    pub fn from_form(form: &RegistrationForm) -> Self {
        let user_type = form.user_type.unwrap_or(UserType::Individual);
        let non_blank = |links: &[String]| -> Vec<String> {
            links
                .iter()
                .map(|l| l.trim().to_string())
                .filter(|l| !l.is_empty())
                .collect()
        };
        Self {
            user_type,
            team_name: (user_type == UserType::Organization)
                .then(|| form.team_name.clone()),
            full_name: form.full_name.clone(),
            gender: form.gender,
            email: form.email.trim().to_string(),
            password: form.password.clone(),
            date_of_birth: (user_type == UserType::Individual)
                .then_some(form.date_of_birth)
                .flatten(),
            country: form.country.clone(),
            state: form.state.clone(),
            city: form.city.clone(),
            address: form.address.clone(),
            phone: form.phone.clone(),
            introduction: form.introduction.clone(),
            talent_scope: form.talent_scope.iter().cloned().collect(),
            social_media_links: non_blank(&form.social_media_links),
            additional_links: non_blank(&form.additional_links),
            portfolio_links: non_blank(&form.portfolio_links),
            profile_image: form.profile_image.clone(),
            certificates: form
                .selected_certificates
                .iter()
                .filter_map(|kind| {
                    form.certificate_files
                        .get(kind)
                        .map(|file| (*kind, file.clone()))
                })
                .collect(),
            agree_terms: form.agree_terms,
        }
    }
}

/// Boundary to the portal backend. One implementation speaks HTTP; tests
/// substitute mocks.
#[async_trait]
pub trait RemoteGateway {
    /// Advisory pre-check; callers treat any failure as "unknown".
    async fn check_email_status(&self, email: &str) -> Result<EmailStatus, GatewayError>;

    /// Resolve a user id by email. `None` means the email is not registered.
    async fn lookup_user_id(&self, email: &str) -> Result<Option<UserId>, GatewayError>;

    async fn register(&self, payload: &RegistrationPayload)
    -> Result<RegisterOutcome, GatewayError>;

    async fn verify_email(&self, email: &str, code: &str)
    -> Result<VerifyOutcome, GatewayError>;

    async fn resend_otp(&self, email: &str) -> Result<ResendOutcome, GatewayError>;

    async fn register_for_event(
        &self,
        event_id: EventId,
        user_id: UserId,
    ) -> Result<ParticipationOutcome, GatewayError>;

    async fn list_events(&self) -> Result<Vec<Event>, GatewayError>;

    async fn list_carousel_items(&self) -> Result<Vec<CarouselItem>, GatewayError>;

    async fn about_us(&self, id: i64) -> Result<Vec<AboutSection>, GatewayError>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn file(name: &str) -> FileAttachment {
        FileAttachment {
            file_name: name.to_string(),
            mime_type: "image/png".to_string(),
            bytes: vec![1, 2, 3],
        }
    }

    #[test]
    fn individual_payload_omits_team_name() {
        let mut form = RegistrationForm::new();
        form.set_user_type(UserType::Individual);
        form.team_name = "stale".to_string();
        form.date_of_birth = NaiveDate::from_ymd_opt(2004, 3, 11);

        let payload = RegistrationPayload::from_form(&form);
        assert!(payload.team_name.is_none());
        assert_eq!(payload.date_of_birth, NaiveDate::from_ymd_opt(2004, 3, 11));
    }

    #[test]
    fn organization_payload_omits_date_of_birth() {
        let mut form = RegistrationForm::new();
        form.set_user_type(UserType::Organization);
        form.team_name = "Glee Club".to_string();

        let payload = RegistrationPayload::from_form(&form);
        assert_eq!(payload.team_name.as_deref(), Some("Glee Club"));
        assert!(payload.date_of_birth.is_none());
    }

    #[test]
    fn blank_link_entries_are_dropped() {
        let mut form = RegistrationForm::new();
        form.social_media_links = vec![
            "https://instagram.com/a".to_string(),
            "   ".to_string(),
            "https://x.com/a".to_string(),
        ];
        let payload = RegistrationPayload::from_form(&form);
        assert_eq!(payload.social_media_links.len(), 2);
    }

    #[test]
    fn only_selected_certificates_carry_files() {
        let mut form = RegistrationForm::new();
        form.attach_certificate(CertificateKind::National, file("n.png")).unwrap();
        form.attach_certificate(CertificateKind::College, file("c.png")).unwrap();
        // deselect one after attaching
        form.remove_certificate(CertificateKind::College);

        let payload = RegistrationPayload::from_form(&form);
        assert_eq!(payload.certificates.len(), 1);
        assert_eq!(payload.certificates[0].0, CertificateKind::National);
    }
}
