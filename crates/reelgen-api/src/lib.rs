//! HTTP request surface for the reelgen pipeline.
//!
//! Routes cover the project lifecycle (create, direct, refine, approve,
//! generate) and job observation (snapshot, cancel). Authentication is an
//! upstream concern; handlers receive the owner id from the `x-owner-id`
//! header and every store access is namespaced by it.

pub mod auth;
pub mod config;
pub mod error;
pub mod extract;
pub mod handlers;
pub mod response;
pub mod routes;
pub mod state;

pub use auth::{OwnerId, OWNER_HEADER};
pub use config::ApiConfig;
pub use error::{ApiError, ApiResult};
pub use response::ApiEnvelope;
pub use routes::create_router;
pub use state::AppState;
