//! HTTP API over the content store.
//!
//! Content collections are plain CRUD (reads are public, writes need an
//! admin session). Player inventory and progress routes need a session for
//! that player. Package application and subquest advancement are single
//! store transactions.

use std::collections::HashMap;
use std::sync::Arc;

use axum::{
    extract::{Path, Query, Request, State},
    http::{header, HeaderMap, StatusCode},
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use log::{error, info, warn};
use serde::{Deserialize, Serialize};

use crate::auth::{AuthError, AuthService};
use crate::config::Config;
use crate::content::{ContentStore, StoreError};
use crate::logutil::escape_log;

mod extract;
mod guard;
mod router;
mod routes_auth;
mod routes_content;
mod routes_progress;
pub mod types;

pub use extract::{ApiJson, ApiPath, ApiQuery};
pub use guard::{AdminSession, AuthSession, SESSION_COOKIE};
pub use router::router;
pub use types::*;

/// Shared handler state.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<ContentStore>,
    pub auth: Arc<AuthService>,
    /// Session lifetime, echoed into the cookie's `Max-Age`.
    pub session_ttl_secs: i64,
}

impl AppState {
    pub fn new(store: Arc<ContentStore>, config: &Config) -> Result<Self, AuthError> {
        let auth = AuthService::new(store.clone(), &config.security)?;
        Ok(Self {
            store,
            auth: Arc::new(auth),
            session_ttl_secs: config.security.session_ttl().num_seconds(),
        })
    }
}

pub struct ApiServer {
    state: AppState,
    bind: String,
}

impl ApiServer {
    pub fn new(config: &Config, store: Arc<ContentStore>) -> anyhow::Result<Self> {
        let state = AppState::new(store, config)?;
        Ok(Self {
            state,
            bind: config.server.bind.clone(),
        })
    }

    /// Serve until Ctrl-C.
    pub async fn run(self) -> anyhow::Result<()> {
        let purged = self.state.auth.purge_expired_sessions()?;
        if purged > 0 {
            info!("Removed {} stale sessions at startup", purged);
        }
        let app = router(self.state);
        let listener = tokio::net::TcpListener::bind(&self.bind).await?;
        info!("Codyssey API listening on http://{}", self.bind);
        axum::serve(listener, app)
            .with_graceful_shutdown(async {
                let _ = tokio::signal::ctrl_c().await;
                info!("Shutdown requested");
            })
            .await?;
        Ok(())
    }
}
