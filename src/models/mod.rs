//! Request and Response models for the query service API
//!
//! This module defines the DTOs (Data Transfer Objects) used for
//! serializing/deserializing HTTP request and response bodies.

pub mod requests;
pub mod responses;

// Re-export commonly used types
pub use requests::{validate_entity, InvalidateRequest, QueryParams, RefreshRequest, ScopeRequest};
pub use responses::{
    HealthResponse, InvalidationResponse, MessageResponse, QueryResponse, ScopeResponse,
    StatsResponse,
};
