//! HTTP middleware stack for admin.
//!
//! # Middleware Order (outermost first)
//!
//! 1. Sentry layers (hub per request, HTTP context)
//! 2. `TraceLayer` (request span)
//! 3. Request ID (recorded on the span, echoed in the response)
//! 4. Session layer (tower-sessions with `PostgreSQL` store)
//!
//! Authentication is enforced per handler with the `RequireAdmin`,
//! `RequireWriter` and `RequireSuperAdmin` extractors.

pub mod auth;
pub mod request_id;
pub mod session;

pub use auth::{
    AdminAuthRejection, RequireAdmin, RequireSuperAdmin, RequireWriter, clear_current_admin,
    set_current_admin,
};
pub use request_id::{REQUEST_ID_HEADER, request_id_middleware};
pub use session::{SESSION_COOKIE_NAME, create_session_layer};
