//! Per-request authentication guard.
//!
//! [`AuthGuard::check`] extracts the session id (cookie or bearer token),
//! loads the session, enforces CSRF protection for cookie-authenticated
//! requests and resolves the user. An admitted request carries a
//! [`Finalizer`] that commits the session once the handler has responded.

mod check;
mod errors;
mod finalizer;
mod options;
mod rejection;
mod request;


pub use check::{Admission, AuthGuard, GuardOutcome, UserLoader};
pub use errors::GuardError;
pub use finalizer::Finalizer;
pub use options::{GuardOptions, UnknownUserPolicy};
pub use rejection::{Rejection, RejectionBody, RejectionKind};
pub use request::GuardRequest;
