//! Client-side core of the campus event portal: form validation, the
//! HTTP gateway to the portal backend, the registration workflow state
//! machine and the event-participation coordinator. Rendering and
//! routing live with the embedding UI, not here.

pub mod domain;
pub mod infrastructure;
pub mod usecase;
