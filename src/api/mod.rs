//! API Module
//!
//! HTTP handlers and routing for the query service.
//!
//! # Endpoints
//! - `GET /query/:entity` - Run a query through cache, breaker and retry
//! - `PUT /scope` - Switch the current project
//! - `POST /refresh` - Drop cached data for a scope or everything
//! - `POST /invalidate` - Drop entries whose key matches a pattern
//! - `POST /session/end` - Sign-out, clears all per-user state
//! - `POST /session/authenticated` - Sign-in, clears all per-user state
//! - `POST /circuit/reset` - Close the circuit breaker
//! - `GET /stats` - Cache, breaker and in-flight statistics
//! - `GET /health` - Health check endpoint

pub mod handlers;
pub mod routes;

pub use handlers::*;
pub use routes::create_router;
