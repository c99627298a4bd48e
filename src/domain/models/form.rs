use std::collections::{BTreeMap, BTreeSet};

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::domain::error::AttachError;

const PROFILE_IMAGE_LIMIT: usize = 1024 * 1024;
const CERTIFICATE_FILE_LIMIT: usize = 2 * 1024 * 1024;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UserType {
    Individual,
    Organization,
}

impl UserType {
    pub fn as_str(&self) -> &'static str {
        match self {
            UserType::Individual => "individual",
            UserType::Organization => "organization",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Gender {
    Male,
    Female,
    Other,
}

impl Gender {
    pub fn as_str(&self) -> &'static str {
        match self {
            Gender::Male => "male",
            Gender::Female => "female",
            Gender::Other => "other",
        }
    }
}

/// The six fixed certificate upload categories.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CertificateKind {
    National,
    International,
    State,
    District,
    College,
    Other,
}

impl CertificateKind {
    pub const ALL: [CertificateKind; 6] = [
        CertificateKind::National,
        CertificateKind::International,
        CertificateKind::State,
        CertificateKind::District,
        CertificateKind::College,
        CertificateKind::Other,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            CertificateKind::National => "national",
            CertificateKind::International => "international",
            CertificateKind::State => "state",
            CertificateKind::District => "district",
            CertificateKind::College => "college",
            CertificateKind::Other => "other",
        }
    }

    /// Multipart field name the backend expects for this category.
    pub fn field_name(&self) -> String {
        format!("{}_certificate", self.as_str())
    }
}

/// An uploaded file held in memory until submission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileAttachment {
    pub file_name: String,
    pub mime_type: String,
    pub bytes: Vec<u8>,
}

impl FileAttachment {
    pub fn is_image(&self) -> bool {
        self.mime_type
            .parse::<mime::Mime>()
            .is_ok_and(|m| m.type_() == mime::IMAGE)
    }

    pub fn is_pdf(&self) -> bool {
        self.mime_type == mime::APPLICATION_PDF.as_ref()
    }
}

/// One registration attempt's form data.
///
/// Owned exclusively by the registration workflow; created when the
/// workflow starts and discarded on success or cancel. Fields are plain
/// values edited by the caller; the attach methods enforce the file
/// size and type limits at upload time.
#[derive(Debug, Clone, Default)]
pub struct RegistrationForm {
    pub user_type: Option<UserType>,
    pub team_name: String,
    pub profile_image: Option<FileAttachment>,
    pub full_name: String,
    pub gender: Option<Gender>,
    pub email: String,
    pub password: String,
    pub confirm_password: String,
    pub date_of_birth: Option<NaiveDate>,
    pub country: String,
    pub state: String,
    pub city: String,
    pub address: String,
    pub phone: String,
    pub introduction: String,
    pub talent_scope: BTreeSet<String>,
    pub social_media_links: Vec<String>,
    pub additional_links: Vec<String>,
    pub portfolio_links: Vec<String>,
    pub selected_certificates: BTreeSet<CertificateKind>,
    pub certificate_files: BTreeMap<CertificateKind, FileAttachment>,
    pub agree_terms: bool,
}

impl RegistrationForm {
    pub fn new() -> Self {
        Self::default()
    }

    /// Switch the account type, clearing fields the new type does not use.
    pub fn set_user_type(&mut self, user_type: UserType) {
        if self.user_type == Some(user_type) {
            return;
        }
        self.user_type = Some(user_type);
        match user_type {
            UserType::Individual => self.team_name.clear(),
            UserType::Organization => self.date_of_birth = None,
        }
    }

    /// Attach the profile image. Must be an image of at most 1 MB.
    pub fn attach_profile_image(&mut self, file: FileAttachment) -> Result<(), AttachError> {
        if file.bytes.len() > PROFILE_IMAGE_LIMIT {
            return Err(AttachError::TooLarge { limit_mb: 1 });
        }
        if !file.is_image() {
            return Err(AttachError::UnsupportedType(file.mime_type));
        }
        self.profile_image = Some(file);
        Ok(())
    }

    /// Attach a certificate file and mark its category selected.
    /// Must be an image or PDF of at most 2 MB.
    pub fn attach_certificate(
        &mut self,
        kind: CertificateKind,
        file: FileAttachment,
    ) -> Result<(), AttachError> {
        if file.bytes.len() > CERTIFICATE_FILE_LIMIT {
            return Err(AttachError::TooLarge { limit_mb: 2 });
        }
        if !file.is_image() && !file.is_pdf() {
            return Err(AttachError::UnsupportedType(file.mime_type));
        }
        self.selected_certificates.insert(kind);
        self.certificate_files.insert(kind, file);
        Ok(())
    }

    /// Deselect a certificate category and drop any file attached for it.
    pub fn remove_certificate(&mut self, kind: CertificateKind) {
        self.selected_certificates.remove(&kind);
        self.certificate_files.remove(&kind);
    }
}
