//! The game's view of the remote progress store.
//!
//! Scenes and dialogues talk to [`ProgressApi`]; `codyssey play` uses the
//! HTTP implementation against a running server, `--local` and the tests use
//! [`StoreProgressClient`] straight over a sled store.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use log::debug;
use serde::de::DeserializeOwned;
use serde::Serialize;
use tokio::time::timeout;

use crate::api::{
    AdvanceRequest, AdvanceResponse, AmountResponse, ApiResponse, InventoryDelta, LoginRequest,
    LoginResponse,
};
use crate::auth::{PublicUser, RegisterRequest};
use crate::config::ClientConfig;
use crate::content::{
    self, ActionRecord, ChoiceRecord, ContentBundle, ContentStore, DialogueRecord,
    InventoryRecord, ItemRecord, LocationRecord, PackageDetailRecord, PackageRecord,
    PlayerProgressRecord, PositionRecord, QuestRecord, Record, StoreError, SubquestRecord,
};

#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("request timed out after {0}s")]
    Timeout(u64),
    #[error("server returned {status}: {message}")]
    Status { status: u16, message: String },
    #[error("unexpected response: {0}")]
    Decode(String),
    #[error("not logged in")]
    NotLoggedIn,
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Request/response collaborator holding content, inventory and progress for one player.
#[async_trait]
pub trait ProgressApi: Send + Sync {
    fn player_id(&self) -> &str;

    /// Every content table, fetched once when a scene is created.
    async fn content(&self) -> Result<ContentBundle, ClientError>;

    async fn player_progress(&self) -> Result<Vec<PlayerProgressRecord>, ClientError>;

    async fn inventory(&self) -> Result<Vec<InventoryRecord>, ClientError>;

    async fn inventory_amount(&self, item_id: u32) -> Result<i64, ClientError>;

    /// Post one signed inventory delta.
    async fn add_inventory(&self, item_id: u32, amount: i64) -> Result<(), ClientError>;

    /// Complete `completed` and open `next` in one call. Returns progress afterwards.
    async fn advance_progress(
        &self,
        completed: u32,
        next: Option<u32>,
    ) -> Result<Vec<PlayerProgressRecord>, ClientError>;
}

// ============================================================================
// HTTP
// ============================================================================

pub struct HttpProgressClient {
    http: reqwest::Client,
    base_url: String,
    timeout_secs: u64,
    token: Option<String>,
    player_id: String,
}

impl HttpProgressClient {
    pub fn new(config: &ClientConfig) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: config.base_url.trim_end_matches('/').to_string(),
            timeout_secs: config.timeout_seconds,
            token: None,
            player_id: String::new(),
        }
    }

    /// Use an existing session token for `player_id`.
    pub fn with_session(mut self, token: &str, player_id: &str) -> Self {
        self.token = Some(token.to_string());
        self.player_id = player_id.to_string();
        self
    }

    pub fn token(&self) -> Option<&str> {
        self.token.as_deref()
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn send<T: DeserializeOwned>(
        &self,
        request: reqwest::RequestBuilder,
    ) -> Result<T, ClientError> {
        let request = match &self.token {
            Some(token) => request.bearer_auth(token),
            None => request,
        };
        let response = timeout(Duration::from_secs(self.timeout_secs), request.send())
            .await
            .map_err(|_| ClientError::Timeout(self.timeout_secs))??;
        let status = response.status();
        let body = response.text().await?;
        let envelope: ApiResponse<T> = serde_json::from_str(&body).map_err(|e| {
            if status.is_success() {
                ClientError::Decode(e.to_string())
            } else {
                ClientError::Status {
                    status: status.as_u16(),
                    message: body.chars().take(200).collect(),
                }
            }
        })?;
        if !status.is_success() || !envelope.success {
            return Err(ClientError::Status {
                status: status.as_u16(),
                message: envelope.message.unwrap_or_default(),
            });
        }
        envelope
            .data
            .ok_or_else(|| ClientError::Decode("response carried no data".to_string()))
    }

    async fn get<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, String)],
    ) -> Result<T, ClientError> {
        debug!("GET {}", path);
        self.send(self.http.get(self.url(path)).query(query)).await
    }

    async fn post<B: Serialize + ?Sized, T: DeserializeOwned>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T, ClientError> {
        debug!("POST {}", path);
        self.send(self.http.post(self.url(path)).json(body)).await
    }

    async fn collection<T: Record>(&self) -> Result<Vec<T>, ClientError> {
        self.get(&format!("/{}", T::COLLECTION), &[]).await
    }

    pub async fn register(&self, req: &RegisterRequest) -> Result<PublicUser, ClientError> {
        self.post("/api/auth/register", req).await
    }

    /// Open a session; later calls act as this user's player.
    pub async fn login(&mut self, username: &str, password: &str) -> Result<PublicUser, ClientError> {
        let body = LoginRequest {
            username: username.to_string(),
            password: password.to_string(),
        };
        let login: LoginResponse = self.post("/api/auth/login", &body).await?;
        self.token = Some(login.token);
        self.player_id = login.user.user_id.clone();
        Ok(login.user)
    }

    fn require_login(&self) -> Result<(), ClientError> {
        if self.token.is_none() || self.player_id.is_empty() {
            return Err(ClientError::NotLoggedIn);
        }
        Ok(())
    }
}

#[async_trait]
impl ProgressApi for HttpProgressClient {
    fn player_id(&self) -> &str {
        &self.player_id
    }

    async fn content(&self) -> Result<ContentBundle, ClientError> {
        Ok(ContentBundle {
            quests: self.collection::<QuestRecord>().await?,
            subquests: self.collection::<SubquestRecord>().await?,
            locations: self.collection::<LocationRecord>().await?,
            positions: self.collection::<PositionRecord>().await?,
            actions: self.collection::<ActionRecord>().await?,
            dialogues: self.collection::<DialogueRecord>().await?,
            choices: self.collection::<ChoiceRecord>().await?,
            items: self.collection::<ItemRecord>().await?,
            packages: self.collection::<PackageRecord>().await?,
            package_details: self.collection::<PackageDetailRecord>().await?,
        })
    }

    async fn player_progress(&self) -> Result<Vec<PlayerProgressRecord>, ClientError> {
        self.require_login()?;
        self.get("/player_progress", &[("player_id", self.player_id.clone())])
            .await
    }

    async fn inventory(&self) -> Result<Vec<InventoryRecord>, ClientError> {
        self.require_login()?;
        self.get("/inventory", &[("player_id", self.player_id.clone())])
            .await
    }

    async fn inventory_amount(&self, item_id: u32) -> Result<i64, ClientError> {
        self.require_login()?;
        let amount: AmountResponse = self
            .get(
                "/inventory/amount",
                &[
                    ("player_id", self.player_id.clone()),
                    ("item_id", item_id.to_string()),
                ],
            )
            .await?;
        Ok(amount.amount)
    }

    async fn add_inventory(&self, item_id: u32, amount: i64) -> Result<(), ClientError> {
        self.require_login()?;
        let delta = InventoryDelta {
            player_id: self.player_id.clone(),
            item_id,
            amount,
        };
        let _record: InventoryRecord = self.post("/inventory", &delta).await?;
        Ok(())
    }

    async fn advance_progress(
        &self,
        completed: u32,
        next: Option<u32>,
    ) -> Result<Vec<PlayerProgressRecord>, ClientError> {
        self.require_login()?;
        let req = AdvanceRequest {
            player_id: self.player_id.clone(),
            completed_subquest_id: completed,
            next_subquest_id: next,
        };
        let resp: AdvanceResponse = self.post("/player_progress/advance", &req).await?;
        Ok(resp.progress)
    }
}

// ============================================================================
// Direct store access
// ============================================================================

/// Plays against a local store without a server.
pub struct StoreProgressClient {
    store: Arc<ContentStore>,
    player_id: String,
}

impl StoreProgressClient {
    pub fn new(store: Arc<ContentStore>, player_id: &str) -> Self {
        Self {
            store,
            player_id: player_id.to_string(),
        }
    }

    pub fn store(&self) -> &Arc<ContentStore> {
        &self.store
    }
}

#[async_trait]
impl ProgressApi for StoreProgressClient {
    fn player_id(&self) -> &str {
        &self.player_id
    }

    async fn content(&self) -> Result<ContentBundle, ClientError> {
        Ok(self.store.content_bundle()?)
    }

    async fn player_progress(&self) -> Result<Vec<PlayerProgressRecord>, ClientError> {
        Ok(content::player_progress(&self.store, &self.player_id)?)
    }

    async fn inventory(&self) -> Result<Vec<InventoryRecord>, ClientError> {
        Ok(content::inventory_for(&self.store, &self.player_id)?)
    }

    async fn inventory_amount(&self, item_id: u32) -> Result<i64, ClientError> {
        Ok(content::item_amount(&self.store, &self.player_id, item_id)?)
    }

    async fn add_inventory(&self, item_id: u32, amount: i64) -> Result<(), ClientError> {
        content::add_item_delta(&self.store, &self.player_id, item_id, amount)?;
        Ok(())
    }

    async fn advance_progress(
        &self,
        completed: u32,
        next: Option<u32>,
    ) -> Result<Vec<PlayerProgressRecord>, ClientError> {
        let resolved = self.store.next_subquest(completed)?.map(|s| s.subquest_id);
        if next.is_some() && next != resolved {
            return Err(StoreError::Conflict(format!(
                "subquest {} is followed by {:?}, not {:?}",
                completed, resolved, next
            ))
            .into());
        }
        Ok(content::advance_progress(&self.store, &self.player_id, completed)?)
    }
}
