//! API Handlers
//!
//! HTTP request handlers exposing the query service.

use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    Json,
};
use serde_json::Value;

use crate::config::Config;
use crate::error::{QueryError, Result};
use crate::models::{
    validate_entity, HealthResponse, InvalidateRequest, InvalidationResponse, MessageResponse,
    QueryParams, QueryResponse, RefreshRequest, ScopeRequest, ScopeResponse, StatsResponse,
};
use crate::service::{QueryOptions, QueryService};
use crate::upstream::{Backend, HttpBackend};

/// Application state shared across all handlers.
#[derive(Clone)]
pub struct AppState {
    /// Query façade over the upstream backend
    pub service: QueryService<Value>,
    /// Where uncached queries are sent
    pub backend: Arc<dyn Backend>,
}

impl AppState {
    pub fn new(service: QueryService<Value>, backend: Arc<dyn Backend>) -> Self {
        Self { service, backend }
    }

    /// Creates a new AppState from configuration, talking HTTP to the upstream.
    pub fn from_config(config: &Config) -> Result<Self> {
        let backend = HttpBackend::new(
            config.upstream_url.clone(),
            std::time::Duration::from_millis(config.upstream_timeout_ms),
        )?;
        Ok(Self::new(QueryService::from_config(config), Arc::new(backend)))
    }
}

/// Handler for GET /query/:entity
pub async fn query_handler(
    State(state): State<AppState>,
    Path(entity): Path<String>,
    Query(params): Query<QueryParams>,
) -> Result<Json<QueryResponse>> {
    if let Some(error_msg) = validate_entity(&entity) {
        return Err(QueryError::InvalidRequest(error_msg));
    }

    let mut options = QueryOptions::new();
    if params.fallback_empty {
        options = options.with_fallback(Value::Array(Vec::new()));
    }
    if params.fresh {
        options = options.bypass_cache();
    }

    let backend = Arc::clone(&state.backend);
    let producer_entity = entity.clone();
    let producer_scope = params.scope_id.clone();
    let producer = move || {
        let backend = Arc::clone(&backend);
        let entity = producer_entity.clone();
        let scope = producer_scope.clone();
        async move { backend.fetch(&entity, scope.as_deref()).await }
    };

    let outcome = state
        .service
        .query(&entity, params.scope_id.as_deref(), producer, options)
        .await?;

    Ok(Json(QueryResponse::new(entity, params.scope_id, outcome)))
}

/// Handler for PUT /scope
pub async fn scope_handler(
    State(state): State<AppState>,
    Json(req): Json<ScopeRequest>,
) -> Json<ScopeResponse> {
    let changed = state.service.on_scope_changed(req.scope_id).await;
    let current_scope = state.service.current_scope().await;

    Json(ScopeResponse {
        changed,
        current_scope,
    })
}

/// Handler for POST /refresh
pub async fn refresh_handler(
    State(state): State<AppState>,
    body: Option<Json<RefreshRequest>>,
) -> Json<InvalidationResponse> {
    let req = body.map(|Json(req)| req).unwrap_or_default();
    let invalidated = state.service.force_refresh(req.scope_id.as_deref()).await;

    Json(InvalidationResponse::new("Cache refreshed", invalidated))
}

/// Handler for POST /invalidate
pub async fn invalidate_handler(
    State(state): State<AppState>,
    Json(req): Json<InvalidateRequest>,
) -> Result<Json<InvalidationResponse>> {
    if let Some(error_msg) = req.validate() {
        return Err(QueryError::InvalidRequest(error_msg));
    }

    let invalidated = state.service.invalidate_matching(&req.pattern).await;
    Ok(Json(InvalidationResponse::new(
        format!("Entries matching '{}' invalidated", req.pattern),
        invalidated,
    )))
}

/// Handler for POST /session/end
pub async fn session_end_handler(State(state): State<AppState>) -> Json<InvalidationResponse> {
    let invalidated = state.service.on_session_ended().await;
    Json(InvalidationResponse::new("Session ended", invalidated))
}

/// Handler for POST /session/authenticated
pub async fn session_authenticated_handler(
    State(state): State<AppState>,
) -> Json<InvalidationResponse> {
    let invalidated = state.service.on_user_authenticated().await;
    Json(InvalidationResponse::new("User authenticated", invalidated))
}

/// Handler for POST /circuit/reset
pub async fn circuit_reset_handler(State(state): State<AppState>) -> Json<MessageResponse> {
    state.service.reset_circuit_breaker().await;
    Json(MessageResponse::new("Circuit breaker reset"))
}

/// Handler for GET /stats
pub async fn stats_handler(State(state): State<AppState>) -> Json<StatsResponse> {
    Json(StatsResponse::new(state.service.stats().await))
}

/// Handler for GET /health
pub async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse::healthy())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::service::{Origin, ServiceSettings};
    use async_trait::async_trait;
    use serde_json::json;
    use std::sync::atomic::{AtomicU32, Ordering};

    struct StaticBackend {
        calls: AtomicU32,
    }

    #[async_trait]
    impl Backend for StaticBackend {
        async fn fetch(&self, entity: &str, scope_id: Option<&str>) -> Result<Value> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            match entity {
                "forbidden" => Err(QueryError::backend(ErrorKind::PermissionDenied, "rls")),
                _ => Ok(json!({ "entity": entity, "scope": scope_id })),
            }
        }
    }

    fn test_state() -> (AppState, Arc<StaticBackend>) {
        let backend = Arc::new(StaticBackend {
            calls: AtomicU32::new(0),
        });
        let service = QueryService::new(
            ServiceSettings::default(),
            Arc::new(crate::clock::SystemClock),
        );
        (AppState::new(service, backend.clone()), backend)
    }

    #[tokio::test]
    async fn test_query_handler_caches() {
        let (state, backend) = test_state();
        let params = || QueryParams {
            scope_id: Some("P1".into()),
            ..Default::default()
        };

        let first = query_handler(State(state.clone()), Path("leads".into()), Query(params()))
            .await
            .unwrap();
        assert_eq!(first.origin, Origin::Backend { attempts: 1 });
        assert_eq!(first.data["scope"], "P1");

        let second = query_handler(State(state), Path("leads".into()), Query(params()))
            .await
            .unwrap();
        assert_eq!(second.origin, Origin::Cache);
        assert_eq!(backend.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_query_handler_rejects_bad_entity() {
        let (state, backend) = test_state();
        let result = query_handler(
            State(state),
            Path("leads@P1".into()),
            Query(QueryParams::default()),
        )
        .await;

        assert!(matches!(result, Err(QueryError::InvalidRequest(_))));
        assert_eq!(backend.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_query_handler_propagates_backend_error() {
        let (state, _) = test_state();
        let result = query_handler(
            State(state),
            Path("forbidden".into()),
            Query(QueryParams::default()),
        )
        .await;

        assert_eq!(result.unwrap_err().kind(), Some(ErrorKind::PermissionDenied));
    }

    #[tokio::test]
    async fn test_scope_handler() {
        let (state, _) = test_state();

        let resp = scope_handler(
            State(state.clone()),
            Json(ScopeRequest {
                scope_id: Some("P1".into()),
            }),
        )
        .await;
        assert!(resp.changed);
        assert_eq!(resp.current_scope.as_deref(), Some("P1"));

        let resp = scope_handler(
            State(state),
            Json(ScopeRequest {
                scope_id: Some("P1".into()),
            }),
        )
        .await;
        assert!(!resp.changed);
    }

    #[tokio::test]
    async fn test_session_end_handler_clears() {
        let (state, _) = test_state();
        query_handler(
            State(state.clone()),
            Path("leads".into()),
            Query(QueryParams::default()),
        )
        .await
        .unwrap();

        let resp = session_end_handler(State(state.clone())).await;
        assert_eq!(resp.invalidated, 1);

        let stats = stats_handler(State(state)).await;
        assert_eq!(stats.stats.cache.total_entries, 0);
    }

    #[tokio::test]
    async fn test_health_handler() {
        let response = health_handler().await;
        assert_eq!(response.status, "healthy");
    }
}
