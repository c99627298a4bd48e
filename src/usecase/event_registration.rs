use tracing::debug;

use crate::domain::{
    error::GatewayError,
    gateway::{EventId, ParticipationOutcome, RemoteGateway, UserId},
};

/// One event-registration attempt from the events view.
#[derive(Debug, Clone)]
pub struct EventRegistrationSession {
    pub email: String,
    pub resolved_user_id: Option<UserId>,
    pub pending_event_id: Option<EventId>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EventRegistrationOutcome {
    Registered,
    /// The email has no account yet; the caller should start the nested
    /// registration workflow. The event is held for a retry afterwards.
    NeedsAccount { pending_event_id: EventId },
    /// Backend refusal, message passed through verbatim.
    Rejected { message: String },
}

/// Gates event participation on "user exists": resolves a user id from
/// an email, and when the email is unknown holds the event id until the
/// nested registration finishes.
pub struct EventRegistrationCoordinator<G: RemoteGateway> {
    gateway: G,
    session: Option<EventRegistrationSession>,
}

impl<G: RemoteGateway + Send + Sync> EventRegistrationCoordinator<G> {
    pub fn new(gateway: G) -> Self {
        Self { gateway, session: None }
    }

    pub fn session(&self) -> Option<&EventRegistrationSession> {
        self.session.as_ref()
    }

    /// Register `email` for `event_id`, resolving the user id first.
    pub async fn register(
        &mut self,
        event_id: EventId,
        email: &str,
    ) -> Result<EventRegistrationOutcome, GatewayError> {
        // A resolved id is reused only for the same email.
        let cached = self
            .session
            .as_ref()
            .filter(|s| s.email == email)
            .and_then(|s| s.resolved_user_id);

        let user_id = match cached {
            Some(id) => id,
            None => match self.gateway.lookup_user_id(email).await? {
                Some(id) => id,
                None => {
                    debug!(event_id, "no account for email, holding event");
                    self.session = Some(EventRegistrationSession {
                        email: email.to_string(),
                        resolved_user_id: None,
                        pending_event_id: Some(event_id),
                    });
                    return Ok(EventRegistrationOutcome::NeedsAccount {
                        pending_event_id: event_id,
                    });
                }
            },
        };

        self.session = Some(EventRegistrationSession {
            email: email.to_string(),
            resolved_user_id: Some(user_id),
            pending_event_id: None,
        });
        self.participate(event_id, user_id).await
    }

    /// After the nested registration completed, retry the held event
    /// registration exactly once. The pending id is cleared whatever the
    /// outcome; a second retry needs a fresh `register` call.
    pub async fn complete_pending(
        &mut self,
    ) -> Result<Option<EventRegistrationOutcome>, GatewayError> {
        let Some(session) = self.session.as_mut() else {
            return Ok(None);
        };
        let Some(event_id) = session.pending_event_id.take() else {
            return Ok(None);
        };
        let email = session.email.clone();

        let Some(user_id) = self.gateway.lookup_user_id(&email).await? else {
            return Ok(Some(EventRegistrationOutcome::Rejected {
                message: "Your account could not be found yet. Please try again.".to_string(),
            }));
        };
        if let Some(session) = self.session.as_mut() {
            session.resolved_user_id = Some(user_id);
        }
        let outcome = self.participate(event_id, user_id).await?;
        Ok(Some(outcome))
    }

    /// Drop the session, releasing any pending event.
    pub fn cancel(&mut self) {
        self.session = None;
    }

    async fn participate(
        &self,
        event_id: EventId,
        user_id: UserId,
    ) -> Result<EventRegistrationOutcome, GatewayError> {
        match self.gateway.register_for_event(event_id, user_id).await? {
            ParticipationOutcome::Registered => Ok(EventRegistrationOutcome::Registered),
            ParticipationOutcome::Rejected { message } => {
                Ok(EventRegistrationOutcome::Rejected { message })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::gateway::{
        EmailStatus, RegisterOutcome, RegistrationPayload, ResendOutcome, VerifyOutcome,
    };
    use crate::domain::models::catalog::{AboutSection, CarouselItem, Event};
    use async_trait::async_trait;
    use rstest::rstest;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct MockGateway {
        /// user id returned by lookup, swappable mid-test
        known_user: Mutex<Option<UserId>>,
        participation: ParticipationOutcome,
        lookup_calls: AtomicUsize,
        participate_calls: AtomicUsize,
    }

    impl MockGateway {
        fn with_user(user: Option<UserId>) -> Self {
            Self {
                known_user: Mutex::new(user),
                participation: ParticipationOutcome::Registered,
                lookup_calls: AtomicUsize::new(0),
                participate_calls: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl RemoteGateway for MockGateway {
        async fn check_email_status(&self, _email: &str) -> Result<EmailStatus, GatewayError> {
            Ok(EmailStatus { registered: false, verified: false })
        }

        async fn lookup_user_id(&self, _email: &str) -> Result<Option<UserId>, GatewayError> {
            self.lookup_calls.fetch_add(1, Ordering::SeqCst);
            Ok(*self.known_user.lock().unwrap())
        }

        async fn register(
            &self,
            payload: &RegistrationPayload,
        ) -> Result<RegisterOutcome, GatewayError> {
            Ok(RegisterOutcome::Registered { registered_email: payload.email.clone() })
        }

        async fn verify_email(
            &self,
            _email: &str,
            _code: &str,
        ) -> Result<VerifyOutcome, GatewayError> {
            Ok(VerifyOutcome::Verified)
        }

        async fn resend_otp(&self, _email: &str) -> Result<ResendOutcome, GatewayError> {
            Ok(ResendOutcome::Sent)
        }

        async fn register_for_event(
            &self,
            _event_id: EventId,
            _user_id: UserId,
        ) -> Result<ParticipationOutcome, GatewayError> {
            self.participate_calls.fetch_add(1, Ordering::SeqCst);
            Ok(self.participation.clone())
        }

        async fn list_events(&self) -> Result<Vec<Event>, GatewayError> {
            Ok(vec![])
        }

        async fn list_carousel_items(&self) -> Result<Vec<CarouselItem>, GatewayError> {
            Ok(vec![])
        }

        async fn about_us(&self, _id: i64) -> Result<Vec<AboutSection>, GatewayError> {
            Ok(vec![])
        }
    }

    #[rstest]
    #[tokio::test]
    async fn known_user_is_registered_directly() {
        let mut coordinator = EventRegistrationCoordinator::new(MockGateway::with_user(Some(7)));
        let outcome = coordinator.register(42, "x@y.com").await.unwrap();
        assert_eq!(outcome, EventRegistrationOutcome::Registered);
        assert_eq!(coordinator.gateway.participate_calls.load(Ordering::SeqCst), 1);
    }

    #[rstest]
    #[tokio::test]
    async fn unknown_email_holds_the_event_without_participating() {
        let mut coordinator = EventRegistrationCoordinator::new(MockGateway::with_user(None));
        let outcome = coordinator.register(42, "x@y.com").await.unwrap();

        assert_eq!(outcome, EventRegistrationOutcome::NeedsAccount { pending_event_id: 42 });
        assert_eq!(coordinator.gateway.participate_calls.load(Ordering::SeqCst), 0);
        assert_eq!(coordinator.session().unwrap().pending_event_id, Some(42));
    }

    #[rstest]
    #[tokio::test]
    async fn pending_event_is_retried_once_after_signup() {
        let mut coordinator = EventRegistrationCoordinator::new(MockGateway::with_user(None));
        coordinator.register(42, "x@y.com").await.unwrap();

        // the nested registration created the account
        *coordinator.gateway.known_user.lock().unwrap() = Some(9);

        let outcome = coordinator.complete_pending().await.unwrap();
        assert_eq!(outcome, Some(EventRegistrationOutcome::Registered));
        assert_eq!(coordinator.gateway.participate_calls.load(Ordering::SeqCst), 1);

        // exactly once: a second completion finds nothing pending
        let again = coordinator.complete_pending().await.unwrap();
        assert_eq!(again, None);
        assert_eq!(coordinator.gateway.participate_calls.load(Ordering::SeqCst), 1);
    }

    #[rstest]
    #[tokio::test]
    async fn rejection_message_is_passed_through_verbatim() {
        let gateway = MockGateway {
            participation: ParticipationOutcome::Rejected {
                message: "Event is full.".to_string(),
            },
            ..MockGateway::with_user(Some(7))
        };
        let mut coordinator = EventRegistrationCoordinator::new(gateway);
        let outcome = coordinator.register(42, "x@y.com").await.unwrap();
        assert_eq!(
            outcome,
            EventRegistrationOutcome::Rejected { message: "Event is full.".to_string() }
        );
    }

    #[rstest]
    #[tokio::test]
    async fn resolved_id_is_reused_within_the_session() {
        let mut coordinator = EventRegistrationCoordinator::new(MockGateway::with_user(Some(7)));
        coordinator.register(42, "x@y.com").await.unwrap();
        coordinator.register(43, "x@y.com").await.unwrap();
        assert_eq!(coordinator.gateway.lookup_calls.load(Ordering::SeqCst), 1);
    }

    #[rstest]
    #[tokio::test]
    async fn a_different_email_forces_a_fresh_lookup() {
        let mut coordinator = EventRegistrationCoordinator::new(MockGateway::with_user(Some(7)));
        coordinator.register(42, "x@y.com").await.unwrap();
        coordinator.register(42, "other@y.com").await.unwrap();
        assert_eq!(coordinator.gateway.lookup_calls.load(Ordering::SeqCst), 2);
    }

    #[rstest]
    #[tokio::test]
    async fn cancel_releases_the_pending_event() {
        let mut coordinator = EventRegistrationCoordinator::new(MockGateway::with_user(None));
        coordinator.register(42, "x@y.com").await.unwrap();
        coordinator.cancel();
        assert!(coordinator.session().is_none());
        assert_eq!(coordinator.complete_pending().await.unwrap(), None);
    }
}
