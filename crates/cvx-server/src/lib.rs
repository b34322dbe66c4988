//! HTTP server for Civilytix.
//!
//! Exposes the extraction gateway and the request ledger over a small JSON
//! API. Callers identify themselves with an out-of-band header resolved by an
//! [`AuthProvider`]; everything behind that is transport-agnostic.

pub mod auth;
pub mod config;
pub mod dto;
pub mod error;
pub mod handler;
pub mod router;
pub mod server;
pub mod state;

pub use auth::{AuthProvider, AuthenticatedUser, Credentials, HeaderAuth, Identity};
pub use config::ServerConfig;
pub use error::{ServerError, ServerResult};
pub use router::{build_router, endpoints};
pub use server::CivilytixServer;
pub use state::AppState;
