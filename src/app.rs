use log::{debug, info, warn};
use reqwest::Client;
use tokio::sync::mpsc::{unbounded_channel, UnboundedReceiver, UnboundedSender};

use crate::api;
use crate::config::Config;
use crate::connection::ConnectionStatus;
use crate::error::{ClientError, Result};
use crate::models::auth::User;
use crate::models::events::Event;
use crate::models::poll::{OptionId, PollId};
use crate::models::requests::CreatePollRequest;
use crate::store::PollsState;
use crate::token::TokenStore;
use crate::websocket::{run_websocket, WsHandle};

/// Everything a view layer drives: the poll store, the viewer's token, and the
/// push channel whose events are applied to the store as they are drained.
pub struct AppState {
    config: Config,
    client: Client,
    store: PollsState,
    token: Option<String>,
    user: Option<User>,
    token_store: Box<dyn TokenStore>,
    status: ConnectionStatus,
    event_sender: UnboundedSender<Event>,
    event_receiver: UnboundedReceiver<Event>,
    ws_handle: Option<WsHandle>,
}

impl AppState {
    /// Builds the state and restores any token persisted by an earlier run.
    pub fn new(
        config: Config,
        token_store: Box<dyn TokenStore>,
        status: ConnectionStatus,
    ) -> Result<Self> {
        let client = Client::builder().build()?;
        let token = token_store.load()?;
        if token.is_some() {
            info!("Restored saved token");
        }
        let (event_sender, event_receiver) = unbounded_channel();

        Ok(Self {
            config,
            client,
            store: PollsState::new(),
            token,
            user: None,
            token_store,
            status,
            event_sender,
            event_receiver,
            ws_handle: None,
        })
    }

    pub fn store(&self) -> &PollsState {
        &self.store
    }

    pub fn token(&self) -> Option<&str> {
        self.token.as_deref()
    }

    pub fn user(&self) -> Option<&User> {
        self.user.as_ref()
    }

    pub fn is_authenticated(&self) -> bool {
        self.token.is_some()
    }

    pub fn is_connected(&self) -> bool {
        self.status.is_connected()
    }

    fn require_token(&self, message: &str) -> Result<String> {
        self.token
            .clone()
            .ok_or_else(|| ClientError::Validation(message.to_string()))
    }

    pub async fn login(&mut self, email: &str, password: &str) -> Result<()> {
        if email.trim().is_empty() || password.is_empty() {
            return Err(ClientError::Validation(
                "Email and password are required".to_string(),
            ));
        }
        let token = api::auth::login(&self.client, &self.config.api_url, email.trim(), password)
            .await?;
        self.token_store.save(&token)?;
        self.token = Some(token);
        self.refresh_user().await;
        Ok(())
    }

    pub async fn register(&mut self, email: &str, username: &str, password: &str) -> Result<User> {
        if email.trim().is_empty() || username.trim().is_empty() || password.is_empty() {
            return Err(ClientError::Validation(
                "Email, username and password are required".to_string(),
            ));
        }
        api::auth::register(
            &self.client,
            &self.config.api_url,
            email.trim(),
            username.trim(),
            password,
        )
        .await
    }

    /// Loads the profile behind the current token. A failure only leaves the
    /// profile unset.
    pub async fn refresh_user(&mut self) {
        let Some(token) = self.token.clone() else {
            return;
        };
        match api::auth::fetch_current_user(&self.client, &self.config.api_url, &token).await {
            Ok(user) => self.user = Some(user),
            Err(e) => warn!("Could not load current user: {}", e),
        }
    }

    pub fn logout(&mut self) -> Result<()> {
        self.token = None;
        self.user = None;
        self.token_store.clear()
    }

    pub async fn fetch_polls(&mut self) -> Result<()> {
        self.store.begin_loading();
        match api::polls::fetch_polls(&self.client, &self.config.api_url, self.token.as_deref())
            .await
        {
            Ok(raw) => {
                self.store.load_polls(&raw);
                Ok(())
            }
            Err(e) => {
                self.store.fail(e.user_message());
                Err(e)
            }
        }
    }

    pub async fn fetch_poll(&mut self, poll_id: PollId) -> Result<()> {
        let raw = api::polls::fetch_poll(
            &self.client,
            &self.config.api_url,
            poll_id,
            self.token.as_deref(),
        )
        .await?;
        self.store
            .load_poll(&raw)
            .map(|_| ())
            .ok_or_else(|| ClientError::InvalidPayload(format!("poll {} has no usable id", poll_id)))
    }

    /// Validates the form input, creates the poll and focuses it.
    pub async fn create_poll(
        &mut self,
        title: &str,
        description: Option<&str>,
        options: &[String],
        allow_multiple_votes: bool,
    ) -> Result<PollId> {
        let request =
            CreatePollRequest::validated(title, description, options, allow_multiple_votes)
                .map_err(ClientError::Validation)?;
        let token = self.require_token("You must be logged in to create a poll")?;

        let raw =
            api::polls::create_poll(&self.client, &self.config.api_url, &request, &token).await?;
        self.store.load_created(&raw).ok_or_else(|| {
            ClientError::InvalidPayload("created poll has no usable id".to_string())
        })
    }

    pub async fn vote(&mut self, poll_id: PollId, option_id: OptionId) -> Result<()> {
        let token = self.require_token("Please sign in to cast your vote.")?;
        api::polls::vote_poll(&self.client, &self.config.api_url, poll_id, option_id, &token)
            .await?;
        self.store.apply_vote(poll_id, option_id);
        Ok(())
    }

    pub async fn like(&mut self, poll_id: PollId) -> Result<()> {
        let token = self.require_token("Please sign in to like polls.")?;
        api::polls::like_poll(&self.client, &self.config.api_url, poll_id, &token).await?;
        self.store.apply_like_toggle(poll_id, true, !self.status.is_connected());
        Ok(())
    }

    pub async fn unlike(&mut self, poll_id: PollId) -> Result<()> {
        let token = self.require_token("Please sign in to like polls.")?;
        api::polls::unlike_poll(&self.client, &self.config.api_url, poll_id, &token).await?;
        self.store.apply_like_toggle(poll_id, false, !self.status.is_connected());
        Ok(())
    }

    /// Opens the push channel, replacing any channel already open.
    pub async fn connect(&mut self, scope: Option<PollId>) {
        self.disconnect().await;
        let ws_url = self.config.ws_url();
        info!("Opening push channel {} (scope: {:?})", ws_url, scope);
        self.ws_handle = Some(run_websocket(
            &ws_url,
            scope,
            self.config.reconnect,
            self.status.clone(),
            self.event_sender.clone(),
        ));
    }

    pub async fn disconnect(&mut self) {
        if let Some(handle) = self.ws_handle.take() {
            handle.shutdown().await;
        }
    }

    fn apply_event(&mut self, event: &Event) {
        match event {
            Event::Connected => debug!("Push channel connected"),
            Event::Disconnected => debug!("Push channel disconnected"),
            Event::Push(push) => self.store.apply_push(push),
        }
    }

    /// Applies every event already queued, returning how many there were.
    pub fn process_events(&mut self) -> usize {
        let mut pending_events = Vec::new();
        while let Ok(event) = self.event_receiver.try_recv() {
            pending_events.push(event);
        }
        for event in &pending_events {
            self.apply_event(event);
        }
        pending_events.len()
    }

    /// Waits for the next event, applies it and hands it back.
    pub async fn next_event(&mut self) -> Option<Event> {
        let event = self.event_receiver.recv().await?;
        self.apply_event(&event);
        Some(event)
    }
}
