//! CLI command handlers
//!
//! Each command builds a short-lived sync session against the configured
//! server, runs one operation through it and prints the result.

use super::output::{
    connection_response, feed_response, get_formatter, success_response, OutputFormatter,
};
use super::{Commands, OutputFormat};
use crate::config::{self, ConfigLoader, NestConfig};
use crate::credentials::{CredentialStore, StoredCredential};
use crate::error::Result;
use crate::push::WsTransport;
use crate::rest::RestClient;
use nest_sync::{
    ClientEvent, Collaborators, PageOutcome, SessionContext, SyncError, SyncSession, View,
};
use serde_json::{json, Value};
use std::sync::Arc;
use tokio::sync::broadcast::error::RecvError;
use tracing::{debug, info, warn};

/// Everything a command needs
pub struct Context {
    config: NestConfig,
    credentials: CredentialStore,
    format: OutputFormat,
}

impl Context {
    pub fn new(config: NestConfig, credentials: CredentialStore, format: OutputFormat) -> Self {
        Self {
            config,
            credentials,
            format,
        }
    }

    fn formatter(&self) -> Box<dyn OutputFormatter> {
        get_formatter(self.format)
    }

    /// Run `command` and print its result
    pub async fn run(&self, command: Commands) -> Result<()> {
        match command {
            Commands::Config if self.format != OutputFormat::Json => show_config(&self.config),
            other => {
                let output = self.execute(other).await?;
                println!("{}", self.formatter().format(&output));
                Ok(())
            }
        }
    }

    /// Run a command and return its final output
    ///
    /// `watch` prints as events arrive and returns once interrupted.
    pub async fn execute(&self, command: Commands) -> Result<Value> {
        match command {
            Commands::Init => {
                config::init_config_directories().await?;
                let path = config::init_project_config().await?;
                info!(path = %path.display(), "configuration initialized");
                Ok(success_response(json!({ "config_path": path.display().to_string() })))
            }
            Commands::Config => {
                let loader = ConfigLoader::new();
                Ok(success_response(json!({
                    "config": serde_json::to_value(&self.config)?,
                    "user_config": loader.get_user_config_path().display().to_string(),
                    "project_config": loader.get_project_config_path().display().to_string(),
                })))
            }
            Commands::Login { user, token } => self.login(user, &token).await,
            Commands::Logout => {
                let existed = self.credentials.clear().await?;
                Ok(success_response(json!({ "signed_out": existed })))
            }
            Commands::Feed { category, pages } => {
                self.with_session(|sync| async move {
                    load_view(&sync, View::Feed, category.unwrap_or_default(), pages).await
                })
                .await
            }
            Commands::Search { query, pages } => {
                self.with_session(|sync| async move {
                    load_view(&sync, View::Search, query, pages).await
                })
                .await
            }
            Commands::Saved => self.show_auth_view(View::Saved).await,
            Commands::Personalized => self.show_auth_view(View::Personalized).await,
            Commands::Save { url } => self.set_saved(url, true).await,
            Commands::Unsave { url } => self.set_saved(url, false).await,
            Commands::Watch => {
                self.watch().await?;
                Ok(success_response(json!({ "watching": false })))
            }
        }
    }

    async fn login(&self, user: Option<String>, token: &str) -> Result<Value> {
        let credential = StoredCredential::new(token.trim(), user);
        self.credentials.save(&credential).await?;
        Ok(success_response(json!({
            "user": credential.username,
            "credentials": self.credentials.path().display().to_string(),
        })))
    }

    /// Start a sync session whose context carries the stored credential
    ///
    /// The push channel is not opened; only `watch` calls `reconnect`.
    pub async fn start_session(&self) -> Result<SyncSession> {
        let session = Arc::new(SessionContext::new());
        if let Some(credential) = self.credentials.load().await? {
            debug!(user = ?credential.username, "using stored credential");
            session.sign_in(credential.username, credential.access_token);
        }

        let rest = Arc::new(RestClient::new(&self.config.server, session.clone())?);
        let collaborators = Collaborators {
            transport: Arc::new(WsTransport::new(self.config.server.ws_url.clone())),
            source: rest.clone(),
            remote: rest,
        };
        Ok(SyncSession::with_session(
            session,
            collaborators,
            self.config.sync.sync_options(),
        ))
    }

    async fn with_session<F, Fut>(&self, operation: F) -> Result<Value>
    where
        F: FnOnce(Arc<SyncSession>) -> Fut,
        Fut: std::future::Future<Output = Result<Value>>,
    {
        let sync = Arc::new(self.start_session().await?);
        let result = operation(sync.clone()).await;
        if let Ok(sync) = Arc::try_unwrap(sync) {
            sync.shutdown().await;
        }
        result
    }

    async fn show_auth_view(&self, view: View) -> Result<Value> {
        self.with_session(|sync| async move {
            sync.feed().activate(view).await?;
            Ok(feed_response(&sync.feed().snapshot(view)))
        })
        .await
    }

    async fn set_saved(&self, url: String, saved: bool) -> Result<Value> {
        self.with_session(|sync| async move {
            sync.set_saved(&url, saved).await?;
            Ok(success_response(json!({ "url": url, "saved": saved })))
        })
        .await
    }

    /// Print the main feed, then follow the push channel until Ctrl-C
    async fn watch(&self) -> Result<()> {
        let sync = self.start_session().await?;
        let result = self.follow(&sync).await;
        sync.shutdown().await;
        result
    }

    async fn follow(&self, sync: &SyncSession) -> Result<()> {
        let formatter = self.formatter();
        if !sync.session().is_signed_in() {
            return Err(SyncError::AuthRequired.into());
        }

        sync.feed().activate(View::Feed).await?;
        println!("{}", formatter.format(&feed_response(&sync.feed().snapshot(View::Feed))));

        let mut events = sync.subscribe();
        sync.reconnect()?;

        loop {
            tokio::select! {
                _ = tokio::signal::ctrl_c() => {
                    info!("interrupted, closing push channel");
                    return Ok(());
                }
                event = events.recv() => match event {
                    Ok(ClientEvent::Connection(snapshot)) => {
                        println!("{}", formatter.format(&connection_response(&snapshot)));
                    }
                    Ok(ClientEvent::ReconnectFailed(error)) => return Err(error.into()),
                    Ok(ClientEvent::Announcement(text)) => {
                        println!("{}", formatter.format(&json!({ "announcement": text })));
                    }
                    Ok(ClientEvent::FeedUpdated(snapshot))
                        if snapshot.view == View::Feed && !snapshot.busy && !snapshot.stale =>
                    {
                        println!("{}", formatter.format(&feed_response(&snapshot)));
                    }
                    Ok(_) => {}
                    Err(RecvError::Lagged(skipped)) => warn!(skipped, "event stream lagged"),
                    Err(RecvError::Closed) => return Ok(()),
                },
            }
        }
    }
}

/// Load page 1 of `view`, then up to `pages - 1` further pages
pub async fn load_view(sync: &SyncSession, view: View, filter: String, pages: u32) -> Result<Value> {
    let feed = sync.feed();
    sync.session().set_active_view(view);

    let mut outcome = feed.load_first_page(view, filter).await?;
    for _ in 1..pages {
        if !matches!(outcome, PageOutcome::Loaded { has_more: true, .. }) {
            break;
        }
        outcome = feed.load_next_page(view).await?;
    }
    Ok(feed_response(&feed.snapshot(view)))
}

/// Show current configuration
fn show_config(config: &NestConfig) -> Result<()> {
    let config_toml = toml::to_string_pretty(config)?;

    println!("Current Configuration:");
    println!("=====================");
    println!("{}", config_toml);

    let loader = ConfigLoader::new();
    println!("Config Locations:");
    println!("  User:    {}", loader.get_user_config_path().display());
    println!("  Project: {}", loader.get_project_config_path().display());

    Ok(())
}
