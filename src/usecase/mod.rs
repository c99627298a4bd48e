pub mod event_registration;
pub mod registration_workflow;
