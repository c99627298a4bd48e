use tracing::debug;

use crate::domain::{
    gateway::{
        EmailStatus, RegisterOutcome, RegistrationPayload, RemoteGateway, ResendOutcome,
        VerifyOutcome,
    },
    models::form::{RegistrationForm, UserType},
    services::validation::{
        ValidationErrorMap, validate_registration, validate_verification_code,
    },
};

pub const RESEND_COOLDOWN_SECONDS: u32 = 60;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkflowStep {
    Filling,
    Previewing,
    AwaitingVerification,
    Verified,
    Failed,
}

/// Epoch-stamped ticket for the advisory email pre-check. The result is
/// only applied if the form has not been edited since the ticket was
/// issued, so late out-of-order responses are discarded.
#[derive(Debug, Clone)]
pub struct EmailProbe {
    epoch: u64,
    pub email: String,
}

/// Run the advisory email-status check. Any transport or parse failure
/// is swallowed; the pre-check never blocks the form.
pub async fn run_email_probe<G>(gateway: &G, probe: &EmailProbe) -> Option<EmailStatus>
where
    G: RemoteGateway + Send + Sync,
{
    gateway.check_email_status(&probe.email).await.ok()
}

/// The registration state machine for one attempt.
///
/// Owns the form for its whole lifetime and serializes gateway calls: a
/// busy flag makes every action a no-op while a previous one is still in
/// flight. Dropping the workflow is the teardown; nothing persists.
pub struct RegistrationWorkflow<G: RemoteGateway> {
    gateway: G,
    form: RegistrationForm,
    step: WorkflowStep,
    errors: ValidationErrorMap,
    registered_email: Option<String>,
    banner: Option<String>,
    email_notice: Option<String>,
    resend_cooldown_seconds: u32,
    busy: bool,
    epoch: u64,
}

impl<G: RemoteGateway + Send + Sync> RegistrationWorkflow<G> {
    pub fn new(gateway: G) -> Self {
        Self {
            gateway,
            form: RegistrationForm::new(),
            step: WorkflowStep::Filling,
            errors: ValidationErrorMap::new(),
            registered_email: None,
            banner: None,
            email_notice: None,
            resend_cooldown_seconds: 0,
            busy: false,
            epoch: 0,
        }
    }

    pub fn step(&self) -> WorkflowStep {
        self.step
    }

    pub fn form(&self) -> &RegistrationForm {
        &self.form
    }

    pub fn errors(&self) -> &ValidationErrorMap {
        &self.errors
    }

    pub fn banner(&self) -> Option<&str> {
        self.banner.as_deref()
    }

    pub fn email_notice(&self) -> Option<&str> {
        self.email_notice.as_deref()
    }

    pub fn registered_email(&self) -> Option<&str> {
        self.registered_email.as_deref()
    }

    pub fn resend_cooldown_seconds(&self) -> u32 {
        self.resend_cooldown_seconds
    }

    pub fn is_busy(&self) -> bool {
        self.busy
    }

    /// Edit one form field. Bumps the edit epoch (late advisory results
    /// become stale) and clears that field's error.
    pub fn edit(&mut self, field: &str, apply: impl FnOnce(&mut RegistrationForm)) {
        apply(&mut self.form);
        self.errors.clear_field(field);
        self.epoch += 1;
    }

    /// Switch account type; clears the errors of the fields the switch
    /// resets along with the fields themselves.
    pub fn set_user_type(&mut self, user_type: UserType) {
        self.form.set_user_type(user_type);
        self.errors.clear_field("user_type");
        self.errors.clear_field("team_name");
        self.errors.clear_field("date_of_birth");
        self.epoch += 1;
    }

    /// Issue a ticket for the advisory email pre-check.
    pub fn email_probe(&self) -> EmailProbe {
        EmailProbe {
            epoch: self.epoch,
            email: self.form.email.trim().to_string(),
        }
    }

    /// Apply an advisory email-status result. A stale ticket (any edit
    /// since it was issued) is ignored.
    pub fn apply_email_status(&mut self, probe: &EmailProbe, status: EmailStatus) {
        if probe.epoch != self.epoch {
            debug!("discarding stale email-status result");
            return;
        }
        self.email_notice = match (status.registered, status.verified) {
            (true, true) => Some("This email is already registered. Try signing in.".to_string()),
            (true, false) => {
                Some("This email is registered but not yet verified.".to_string())
            }
            _ => None,
        };
    }

    /// Validate and move to the preview step. Returns true on success;
    /// otherwise the error map holds every violated field.
    pub fn advance(&mut self) -> bool {
        if self.step != WorkflowStep::Filling || self.busy {
            return false;
        }
        self.errors = validate_registration(&self.form);
        if self.errors.is_empty() {
            self.step = WorkflowStep::Previewing;
            true
        } else {
            false
        }
    }

    /// Return from preview to editing.
    pub fn back(&mut self) {
        if self.step == WorkflowStep::Previewing && !self.busy {
            self.step = WorkflowStep::Filling;
        }
    }

    /// Leave the failure banner and try again: back to verification if a
    /// registration already went through, otherwise back to preview.
    pub fn retry(&mut self) {
        if self.step != WorkflowStep::Failed {
            return;
        }
        self.step = if self.registered_email.is_some() {
            WorkflowStep::AwaitingVerification
        } else {
            WorkflowStep::Previewing
        };
        self.banner = None;
    }

    /// Submit the previewed form to the backend.
    pub async fn submit(&mut self) {
        if self.step != WorkflowStep::Previewing || self.busy {
            return;
        }
        let payload = RegistrationPayload::from_form(&self.form);
        let submitted_email = payload.email.clone();

        self.busy = true;
        let result = self.gateway.register(&payload).await;
        self.busy = false;

        match result {
            Ok(RegisterOutcome::Registered { registered_email }) => {
                self.registered_email = Some(registered_email);
                self.banner = None;
                self.resend_cooldown_seconds = RESEND_COOLDOWN_SECONDS;
                self.step = WorkflowStep::AwaitingVerification;
            }
            Ok(RegisterOutcome::AlreadyRegisteredUnverified { message }) => {
                // The backend resent a code for the earlier attempt; move
                // straight to verification with the banner retained.
                self.registered_email = Some(submitted_email);
                self.banner = Some(message);
                self.resend_cooldown_seconds = RESEND_COOLDOWN_SECONDS;
                self.step = WorkflowStep::AwaitingVerification;
            }
            Ok(RegisterOutcome::AlreadyRegisteredVerified { message })
            | Ok(RegisterOutcome::PhoneInUse { message }) => {
                self.banner = Some(message);
            }
            Ok(RegisterOutcome::FieldErrors(server_errors)) => {
                self.errors.merge(server_errors);
                self.step = WorkflowStep::Filling;
            }
            Ok(RegisterOutcome::Rejected { message }) => {
                self.banner = Some(message);
                self.step = WorkflowStep::Failed;
            }
            Err(error) => {
                self.banner = Some(error.to_string());
                self.step = WorkflowStep::Failed;
            }
        }
    }

    /// Exchange the emailed verification code.
    pub async fn verify(&mut self, code: &str) {
        if self.step != WorkflowStep::AwaitingVerification || self.busy {
            return;
        }
        self.errors = validate_verification_code(code);
        if !self.errors.is_empty() {
            return;
        }
        let Some(email) = self.registered_email.clone() else {
            return;
        };

        self.busy = true;
        let result = self.gateway.verify_email(&email, code.trim()).await;
        self.busy = false;

        match result {
            Ok(VerifyOutcome::Verified) => {
                self.banner = None;
                self.step = WorkflowStep::Verified;
            }
            Ok(VerifyOutcome::Rejected { message }) => {
                // Stay put; the code field is retained for correction.
                self.banner = Some(message);
            }
            Err(error) => {
                self.banner = Some(error.to_string());
                self.step = WorkflowStep::Failed;
            }
        }
    }

    /// Ask the backend to resend the code. A no-op while the cooldown is
    /// running or a call is in flight; the cooldown is not reset by the
    /// no-op.
    pub async fn resend(&mut self) {
        if self.step != WorkflowStep::AwaitingVerification
            || self.busy
            || self.resend_cooldown_seconds > 0
        {
            return;
        }
        let Some(email) = self.registered_email.clone() else {
            return;
        };

        self.busy = true;
        let result = self.gateway.resend_otp(&email).await;
        self.busy = false;

        match result {
            Ok(ResendOutcome::Sent) => {
                self.resend_cooldown_seconds = RESEND_COOLDOWN_SECONDS;
                self.banner = Some("A new verification code has been sent.".to_string());
            }
            Ok(ResendOutcome::Rejected { message }) => {
                self.banner = Some(message);
            }
            Err(error) => {
                self.banner = Some(error.to_string());
                self.step = WorkflowStep::Failed;
            }
        }
    }

    /// Count the resend cooldown down by one second. Driven by the host
    /// once per second while the verification step is shown.
    pub fn tick_cooldown(&mut self) {
        self.resend_cooldown_seconds = self.resend_cooldown_seconds.saturating_sub(1);
    }

    /// Abandon the attempt. The form, timers and any in-flight call's
    /// effects are released with it.
    pub fn cancel(self) {}
}
