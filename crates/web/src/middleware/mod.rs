//! HTTP middleware stack for the store finder.
//!
//! # Middleware Order (outermost first, as applied in `main`)
//!
//! 1. Sentry layers (capture errors, transactions)
//! 2. `TraceLayer` (request tracing)
//! 3. Session layer (tower-sessions with `PostgreSQL` store)
//! 4. Request ID (add unique ID to each request)
//! 5. Security headers (CSP, frame options, etc.)
//! 6. Rate limiting (governor) on auth and API routes

pub mod auth;
pub mod flash;
pub mod rate_limit;
pub mod request_id;
pub mod security_headers;
pub mod session;

pub use auth::{RequireAuth, session_state, sign_in, sign_out};
pub use flash::{Page, QuietPage, push_flash, take_flashes};
pub use rate_limit::{RateLimiterLayer, api_rate_limiter, auth_rate_limiter};
pub use request_id::request_id_middleware;
pub use security_headers::security_headers_middleware;
pub use session::{create_session_layer, session_layer_with_store};
