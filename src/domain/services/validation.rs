use std::collections::BTreeMap;
use std::sync::LazyLock;

use chrono::{NaiveDate, Utc};
use regex::Regex;

use crate::domain::models::form::{RegistrationForm, UserType};

static FULL_NAME_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z\s]+$").expect("valid regex"));
static EMAIL_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("valid regex"));
// Loose URL shape: optional scheme, a dotted host, optional path.
static URL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(https?://)?[A-Za-z0-9][A-Za-z0-9.-]*\.[A-Za-z]{2,}(/\S*)?$")
        .expect("valid regex")
});

const INTRODUCTION_MIN: usize = 50;
const INTRODUCTION_MAX: usize = 500;
const MINIMUM_AGE_YEARS: f64 = 13.0;
const DAYS_PER_YEAR: f64 = 365.25;

/// Per-field validation result: a single message, or one slot per entry
/// for the repeatable link fields.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldError {
    Message(String),
    PerIndex(Vec<Option<String>>),
}

/// Field name → error, ordered for stable rendering. An empty map means
/// the input is valid.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidationErrorMap(BTreeMap<String, FieldError>);

impl ValidationErrorMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn message(&mut self, field: &str, message: impl Into<String>) {
        self.0
            .insert(field.to_string(), FieldError::Message(message.into()));
    }

    pub fn per_index(&mut self, field: &str, slots: Vec<Option<String>>) {
        self.0.insert(field.to_string(), FieldError::PerIndex(slots));
    }

    pub fn get(&self, field: &str) -> Option<&FieldError> {
        self.0.get(field)
    }

    /// Drop the error for one field, used when the user edits that field.
    pub fn clear_field(&mut self, field: &str) {
        self.0.remove(field);
    }

    /// Absorb another map, overwriting colliding fields. Used to fold
    /// server-reported field errors into locally computed ones.
    pub fn merge(&mut self, other: ValidationErrorMap) {
        self.0.extend(other.0);
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &FieldError)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v))
    }
}

/// Check the whole registration form against the field rules.
///
/// Every violated field is reported; rules never short-circuit each other.
pub fn validate_registration(form: &RegistrationForm) -> ValidationErrorMap {
    validate_registration_on(form, Utc::now().date_naive())
}

/// Deterministic core of [`validate_registration`]; `today` anchors the
/// date-of-birth rules.
pub fn validate_registration_on(form: &RegistrationForm, today: NaiveDate) -> ValidationErrorMap {
    let mut errors = ValidationErrorMap::new();

    if form.user_type.is_none() {
        errors.message("user_type", "Select an account type");
    }

    if form.user_type == Some(UserType::Organization) && form.team_name.trim().is_empty() {
        errors.message("team_name", "Team name is required");
    }

    if form.full_name.trim().is_empty() {
        errors.message("full_name", "Full name is required");
    } else if !FULL_NAME_RE.is_match(&form.full_name) {
        errors.message("full_name", "Full name may contain only letters and spaces");
    }

    if form.gender.is_none() {
        errors.message("gender", "Please select a gender");
    }

    if form.user_type == Some(UserType::Individual) {
        match form.date_of_birth {
            None => errors.message("date_of_birth", "Date of birth is required"),
            Some(dob) if dob > today => {
                errors.message("date_of_birth", "Date of birth cannot be in the future")
            }
            Some(dob) => {
                let age_years = (today - dob).num_days() as f64 / DAYS_PER_YEAR;
                if age_years < MINIMUM_AGE_YEARS {
                    errors.message("date_of_birth", "You must be at least 13 years old");
                }
            }
        }
    }

    if form.email.trim().is_empty() {
        errors.message("email", "Email is required");
    } else if !EMAIL_RE.is_match(form.email.trim()) {
        errors.message("email", "Enter a valid email address");
    }

    if form.password.is_empty() {
        errors.message("password", "Password is required");
    } else if !password_is_strong(&form.password) {
        errors.message(
            "password",
            "Password must be at least 8 characters with an uppercase letter, a lowercase letter and a digit",
        );
    }

    if form.confirm_password.is_empty() {
        errors.message("confirm_password", "Please confirm your password");
    } else if form.confirm_password != form.password {
        errors.message("confirm_password", "Passwords do not match");
    }

    for (field, label) in [
        ("country", "Country"),
        ("state", "State"),
        ("city", "City"),
        ("address", "Address"),
    ] {
        let value = match field {
            "country" => &form.country,
            "state" => &form.state,
            "city" => &form.city,
            _ => &form.address,
        };
        if value.trim().is_empty() {
            errors.message(field, format!("{label} is required"));
        }
    }

    if form.phone.trim().is_empty() {
        errors.message("phone", "Phone number is required");
    } else {
        let digits: String = form.phone.chars().filter(|c| c.is_ascii_digit()).collect();
        if digits.len() != 10 {
            errors.message("phone", "Phone number must be exactly 10 digits");
        }
    }

    if form.talent_scope.is_empty() {
        errors.message("talent_scope", "Select at least one talent area");
    }

    if let Some(slots) = check_links(&form.social_media_links, true) {
        errors.per_index("social_media_links", slots);
    }
    if let Some(slots) = check_links(&form.additional_links, false) {
        errors.per_index("additional_links", slots);
    }
    if let Some(slots) = check_links(&form.portfolio_links, false) {
        errors.per_index("portfolio_links", slots);
    }

    let intro_len = form.introduction.chars().count();
    if form.introduction.trim().is_empty() {
        errors.message("introduction", "Introduction is required");
    } else if !(INTRODUCTION_MIN..=INTRODUCTION_MAX).contains(&intro_len) {
        errors.message(
            "introduction",
            format!("Introduction must be between {INTRODUCTION_MIN} and {INTRODUCTION_MAX} characters"),
        );
    }

    let missing_files: Vec<&str> = form
        .selected_certificates
        .iter()
        .filter(|kind| !form.certificate_files.contains_key(kind))
        .map(|kind| kind.as_str())
        .collect();
    if !missing_files.is_empty() {
        errors.message(
            "certificates",
            format!("Attach a file for each selected certificate: {}", missing_files.join(", ")),
        );
    }

    if !form.agree_terms {
        errors.message("agree_terms", "You must accept the terms and conditions");
    }

    errors
}

/// The email verification code: exactly six digits.
pub fn validate_verification_code(code: &str) -> ValidationErrorMap {
    let mut errors = ValidationErrorMap::new();
    let code = code.trim();
    if code.is_empty() {
        errors.message("code", "Enter the verification code");
    } else if code.len() != 6 || !code.chars().all(|c| c.is_ascii_digit()) {
        errors.message("code", "The verification code is 6 digits");
    }
    errors
}

fn password_is_strong(password: &str) -> bool {
    password.len() >= 8
        && password.chars().any(|c| c.is_ascii_lowercase())
        && password.chars().any(|c| c.is_ascii_uppercase())
        && password.chars().any(|c| c.is_ascii_digit())
}

/// Validate a repeatable link field. Returns index-aligned error slots,
/// or None when the field passes. A required field with no non-blank
/// entry reports on slot 0.
fn check_links(links: &[String], required: bool) -> Option<Vec<Option<String>>> {
    let mut slots: Vec<Option<String>> = vec![None; links.len().max(1)];
    let mut any_filled = false;
    let mut any_error = false;

    for (i, link) in links.iter().enumerate() {
        let trimmed = link.trim();
        if trimmed.is_empty() {
            continue;
        }
        any_filled = true;
        if !URL_RE.is_match(trimmed) {
            slots[i] = Some("Enter a valid link".to_string());
            any_error = true;
        }
    }

    if required && !any_filled {
        slots[0] = Some("At least one social media link is required".to_string());
        any_error = true;
    }

    any_error.then_some(slots)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::models::form::{CertificateKind, FileAttachment, Gender};
    use rstest::rstest;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 8, 30).unwrap()
    }

    /// A form that passes every rule for an Individual account.
    fn valid_form() -> RegistrationForm {
        let mut form = RegistrationForm::new();
        form.set_user_type(UserType::Individual);
        form.full_name = "Asha Verma".to_string();
        form.gender = Some(Gender::Female);
        form.email = "asha@example.com".to_string();
        form.password = "Sunrise42".to_string();
        form.confirm_password = "Sunrise42".to_string();
        form.date_of_birth = NaiveDate::from_ymd_opt(2004, 3, 11);
        form.country = "India".to_string();
        form.state = "Kerala".to_string();
        form.city = "Kochi".to_string();
        form.address = "14 Marine Drive".to_string();
        form.phone = "9876543210".to_string();
        form.introduction =
            "I am a second-year student who sings, paints and has performed at several inter-college festivals."
                .to_string();
        form.talent_scope.insert("music".to_string());
        form.social_media_links = vec!["https://instagram.com/asha".to_string()];
        form.agree_terms = true;
        form
    }

    #[test]
    fn valid_individual_form_has_no_errors() {
        let errors = validate_registration_on(&valid_form(), today());
        assert!(errors.is_empty(), "unexpected errors: {errors:?}");
    }

    #[test]
    fn organization_requires_team_name() {
        let mut form = valid_form();
        form.set_user_type(UserType::Organization);
        let errors = validate_registration_on(&form, today());
        assert!(errors.get("team_name").is_some());
    }

    #[test]
    fn individual_never_reports_team_name() {
        let mut form = valid_form();
        form.team_name = "left over".to_string();
        let errors = validate_registration_on(&form, today());
        assert!(errors.get("team_name").is_none());
    }

    #[test]
    fn organization_does_not_require_date_of_birth() {
        let mut form = valid_form();
        form.set_user_type(UserType::Organization);
        form.team_name = "Drama Circle".to_string();
        let errors = validate_registration_on(&form, today());
        assert!(errors.get("date_of_birth").is_none());
    }

    #[rstest]
    #[case("Asha Verma", true)]
    #[case("As4a", false)]
    #[case("", false)]
    #[case("O'Neill", false)]
    fn full_name_letters_and_spaces_only(#[case] name: &str, #[case] ok: bool) {
        let mut form = valid_form();
        form.full_name = name.to_string();
        let errors = validate_registration_on(&form, today());
        assert_eq!(errors.get("full_name").is_none(), ok);
    }

    #[test]
    fn future_date_of_birth_is_rejected() {
        let mut form = valid_form();
        form.date_of_birth = NaiveDate::from_ymd_opt(2027, 1, 1);
        let errors = validate_registration_on(&form, today());
        assert!(errors.get("date_of_birth").is_some());
    }

    #[test]
    fn under_thirteen_is_rejected() {
        let mut form = valid_form();
        form.date_of_birth = NaiveDate::from_ymd_opt(2015, 1, 1);
        let errors = validate_registration_on(&form, today());
        assert!(errors.get("date_of_birth").is_some());
    }

    #[rstest]
    #[case("asha@example.com", true)]
    #[case("ASHA@EXAMPLE.COM", true)]
    #[case("asha@example", false)]
    #[case("not an email", false)]
    fn email_shape(#[case] email: &str, #[case] ok: bool) {
        let mut form = valid_form();
        form.email = email.to_string();
        let errors = validate_registration_on(&form, today());
        assert_eq!(errors.get("email").is_none(), ok);
    }

    #[rstest]
    #[case("Sunrise42", true)]
    #[case("sunrise42", false)] // no uppercase
    #[case("SUNRISE42", false)] // no lowercase
    #[case("Sunrisers", false)] // no digit
    #[case("Su4r", false)] // too short
    fn password_strength(#[case] password: &str, #[case] ok: bool) {
        let mut form = valid_form();
        form.password = password.to_string();
        form.confirm_password = password.to_string();
        let errors = validate_registration_on(&form, today());
        assert_eq!(errors.get("password").is_none(), ok);
    }

    #[test]
    fn mismatched_confirmation_is_reported() {
        let mut form = valid_form();
        form.confirm_password = "Different1".to_string();
        let errors = validate_registration_on(&form, today());
        assert!(errors.get("confirm_password").is_some());
    }

    #[rstest]
    #[case("1234567890", true)]
    #[case("123-456-7890", true)] // non-digits stripped before counting
    #[case("12345", false)]
    #[case("12345678901", false)]
    fn phone_requires_ten_digits(#[case] phone: &str, #[case] ok: bool) {
        let mut form = valid_form();
        form.phone = phone.to_string();
        let errors = validate_registration_on(&form, today());
        assert_eq!(errors.get("phone").is_none(), ok);
    }

    #[rstest]
    #[case(49, false)]
    #[case(50, true)]
    #[case(500, true)]
    #[case(501, false)]
    fn introduction_length_bounds(#[case] len: usize, #[case] ok: bool) {
        let mut form = valid_form();
        form.introduction = "x".repeat(len);
        let errors = validate_registration_on(&form, today());
        assert_eq!(errors.get("introduction").is_none(), ok);
    }

    #[test]
    fn social_links_require_one_entry() {
        let mut form = valid_form();
        form.social_media_links = vec!["  ".to_string()];
        let errors = validate_registration_on(&form, today());
        match errors.get("social_media_links") {
            Some(FieldError::PerIndex(slots)) => assert!(slots[0].is_some()),
            other => panic!("expected per-index error, got {other:?}"),
        }
    }

    #[test]
    fn bad_link_reports_at_its_index() {
        let mut form = valid_form();
        form.social_media_links =
            vec!["instagram.com/asha".to_string(), "not a url".to_string()];
        let errors = validate_registration_on(&form, today());
        match errors.get("social_media_links") {
            Some(FieldError::PerIndex(slots)) => {
                assert!(slots[0].is_none());
                assert!(slots[1].is_some());
            }
            other => panic!("expected per-index error, got {other:?}"),
        }
    }

    #[test]
    fn optional_link_lists_pass_when_empty() {
        let mut form = valid_form();
        form.additional_links = vec![];
        form.portfolio_links = vec!["".to_string()];
        let errors = validate_registration_on(&form, today());
        assert!(errors.get("additional_links").is_none());
        assert!(errors.get("portfolio_links").is_none());
    }

    #[test]
    fn selected_certificate_without_file_blocks() {
        let mut form = valid_form();
        form.selected_certificates.insert(CertificateKind::State);
        let errors = validate_registration_on(&form, today());
        assert!(errors.get("certificates").is_some());
    }

    #[test]
    fn attached_certificate_satisfies_selection() {
        let mut form = valid_form();
        form.attach_certificate(
            CertificateKind::State,
            FileAttachment {
                file_name: "state.png".to_string(),
                mime_type: "image/png".to_string(),
                bytes: vec![0u8; 8],
            },
        )
        .unwrap();
        let errors = validate_registration_on(&form, today());
        assert!(errors.get("certificates").is_none());
    }

    #[test]
    fn terms_must_be_accepted() {
        let mut form = valid_form();
        form.agree_terms = false;
        let errors = validate_registration_on(&form, today());
        assert!(errors.get("agree_terms").is_some());
    }

    #[test]
    fn all_violations_reported_together() {
        let form = RegistrationForm::new();
        let errors = validate_registration_on(&form, today());
        assert!(errors.len() >= 10, "expected many errors, got {}", errors.len());
    }

    #[rstest]
    #[case("123456", true)]
    #[case("12345", false)]
    #[case("1234567", false)]
    #[case("12345a", false)]
    #[case("", false)]
    fn verification_code_is_six_digits(#[case] code: &str, #[case] ok: bool) {
        let errors = validate_verification_code(code);
        assert_eq!(errors.is_empty(), ok);
    }

    #[test]
    fn editing_clears_a_single_field() {
        let mut errors = ValidationErrorMap::new();
        errors.message("email", "Email is required");
        errors.message("phone", "Phone number is required");
        errors.clear_field("email");
        assert!(errors.get("email").is_none());
        assert!(errors.get("phone").is_some());
    }
}
