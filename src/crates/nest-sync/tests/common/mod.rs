//! Shared fakes for the integration tests

#![allow(dead_code)]

use async_trait::async_trait;
use nest_sync::{
    Article, ArticleSource, ArticleSummary, ChannelStream, Result, SaveRemote, SyncError,
    Transport, View,
};
use parking_lot::Mutex;
use std::collections::{HashMap, VecDeque};
use std::future::Future;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::Instant;

/// `n` distinct articles whose URLs start with `prefix`
pub fn articles(prefix: &str, n: usize) -> Vec<Article> {
    (0..n)
        .map(|i| {
            Article::from(ArticleSummary {
                url: format!("https://news.example/{}/{}", prefix, i),
                title: format!("{} story {}", prefix, i),
                source: "Example Wire".to_string(),
                content: None,
                published_at: None,
                category: Some("Technology".to_string()),
                image_url: None,
            })
        })
        .collect()
}

/// One recorded `fetch_page` call
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchCall {
    pub view: View,
    pub page: u32,
    pub filter: String,
}

/// Article source answering from queued responses
///
/// Responses are taken in call order, before any latency. Unqueued
/// requests get an empty page.
#[derive(Default)]
pub struct FakeSource {
    responses: Mutex<HashMap<(View, u32), VecDeque<Result<Vec<Article>>>>>,
    latency: Mutex<HashMap<String, Duration>>,
    calls: Mutex<Vec<FetchCall>>,
}

impl FakeSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn respond(&self, view: View, page: u32, response: Result<Vec<Article>>) {
        self.responses
            .lock()
            .entry((view, page))
            .or_default()
            .push_back(response);
    }

    /// Delay responses for `filter`
    pub fn slow_filter(&self, filter: &str, latency: Duration) {
        self.latency.lock().insert(filter.to_string(), latency);
    }

    pub fn calls(&self) -> Vec<FetchCall> {
        self.calls.lock().clone()
    }

    pub fn call_count(&self, view: View) -> usize {
        self.calls.lock().iter().filter(|c| c.view == view).count()
    }
}

#[async_trait]
impl ArticleSource for FakeSource {
    async fn fetch_page(
        &self,
        view: View,
        page: u32,
        _page_size: usize,
        filter: &str,
    ) -> Result<Vec<Article>> {
        self.calls.lock().push(FetchCall {
            view,
            page,
            filter: filter.to_string(),
        });

        let response = self
            .responses
            .lock()
            .get_mut(&(view, page))
            .and_then(VecDeque::pop_front)
            .unwrap_or_else(|| Ok(Vec::new()));

        let latency = self.latency.lock().get(filter).copied();
        if let Some(latency) = latency {
            tokio::time::sleep(latency).await;
        }
        response
    }
}

/// Save endpoint that fails for URLs registered with `reject`
#[derive(Default)]
pub struct FakeRemote {
    rejected: Mutex<HashMap<String, SyncError>>,
    calls: Mutex<Vec<(String, bool)>>,
}

impl FakeRemote {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reject(&self, entity_id: &str, error: SyncError) {
        self.rejected.lock().insert(entity_id.to_string(), error);
    }

    pub fn calls(&self) -> Vec<(String, bool)> {
        self.calls.lock().clone()
    }
}

#[async_trait]
impl SaveRemote for FakeRemote {
    async fn set_saved(&self, entity_id: &str, saved: bool) -> Result<()> {
        self.calls.lock().push((entity_id.to_string(), saved));
        match self.rejected.lock().get(entity_id) {
            Some(error) => Err(error.clone()),
            None => Ok(()),
        }
    }
}

enum Connect {
    Refuse,
    Accept(mpsc::UnboundedReceiver<String>),
}

/// Transport that follows a script of accepted and refused connects
///
/// Once the script runs out every connect is refused.
#[derive(Default)]
pub struct ScriptedTransport {
    script: Mutex<VecDeque<Connect>>,
    connects: Mutex<Vec<(Instant, String)>>,
}

impl ScriptedTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn refuse(&self) {
        self.script.lock().push_back(Connect::Refuse);
    }

    /// Queue an accepted connect; send on the returned handle to push frames,
    /// drop it to have the server close the channel
    pub fn accept(&self) -> mpsc::UnboundedSender<String> {
        let (tx, rx) = mpsc::unbounded_channel();
        self.script.lock().push_back(Connect::Accept(rx));
        tx
    }

    /// Instants at which connects were attempted
    pub fn connect_times(&self) -> Vec<Instant> {
        self.connects.lock().iter().map(|(at, _)| *at).collect()
    }

    pub fn connect_count(&self) -> usize {
        self.connects.lock().len()
    }

    pub fn tokens(&self) -> Vec<String> {
        self.connects.lock().iter().map(|(_, t)| t.clone()).collect()
    }
}

#[async_trait]
impl Transport for ScriptedTransport {
    async fn connect(&self, token: &str) -> Result<Box<dyn ChannelStream>> {
        self.connects
            .lock()
            .push((Instant::now(), token.to_string()));

        let next = self.script.lock().pop_front();
        match next {
            Some(Connect::Accept(frames)) => Ok(Box::new(FakeStream(frames))),
            Some(Connect::Refuse) | None => {
                Err(SyncError::Network("connection refused".to_string()))
            }
        }
    }
}

struct FakeStream(mpsc::UnboundedReceiver<String>);

#[async_trait]
impl ChannelStream for FakeStream {
    async fn next_frame(&mut self) -> Option<Result<String>> {
        self.0.recv().await.map(Ok)
    }

    async fn close(&mut self) -> Result<()> {
        self.0.close();
        Ok(())
    }
}

/// Await `fut`, failing the test if it takes longer than a minute of (virtual) time
pub async fn within<T>(fut: impl Future<Output = T>) -> T {
    tokio::time::timeout(Duration::from_secs(60), fut)
        .await
        .expect("timed out waiting for condition")
}

/// A `new_article` frame the way the server sends it
pub fn new_article_frame(url: &str, title: &str) -> String {
    serde_json::json!({
        "type": "new_article",
        "article": {
            "url": url,
            "title": title,
            "source": "Example Wire",
            "content": "Fresh off the press",
            "published_at": "2026-10-19T08:30:00",
            "category": "Technology",
        }
    })
    .to_string()
}
