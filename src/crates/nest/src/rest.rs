//! REST collaborators: article listing and saved-article mutations

use crate::config::ServerConfig;
use crate::error::Result;
use async_trait::async_trait;
use nest_sync::{Article, ArticleSource, SaveRemote, SessionContext, SyncError, View};
use reqwest::{Method, Response, Url};
use serde::Deserialize;
use std::sync::Arc;
use tracing::debug;

/// Either `{ "articles": [...] }` or a bare array
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum ArticleList {
    Wrapped {
        #[serde(alias = "items")]
        articles: Vec<Article>,
    },
    Bare(Vec<Article>),
}

impl ArticleList {
    /// Listed articles; everything in the saved view is saved whatever the flag says
    fn into_articles(self, saved_view: bool) -> Vec<Article> {
        let mut articles = match self {
            ArticleList::Wrapped { articles } => articles,
            ArticleList::Bare(articles) => articles,
        };
        if saved_view {
            for article in &mut articles {
                article.is_saved = true;
            }
        }
        articles
    }
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    detail: String,
}

/// HTTP client for the News Nest REST API
///
/// Authenticated calls read the bearer credential from the shared
/// [`SessionContext`] at request time.
pub struct RestClient {
    http: reqwest::Client,
    api_url: String,
    session: Arc<SessionContext>,
}

impl RestClient {
    /// Create a client for `config.api_url`
    pub fn new(config: &ServerConfig, session: Arc<SessionContext>) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(config.timeout())
            .build()?;
        Ok(Self {
            http,
            api_url: config.api_url.trim_end_matches('/').to_string(),
            session,
        })
    }

    fn url(&self, path: &str, params: &[(&str, String)]) -> nest_sync::Result<Url> {
        let base = format!("{}{}", self.api_url, path);
        Url::parse_with_params(&base, params)
            .map_err(|e| SyncError::Network(format!("invalid URL {}: {}", base, e)))
    }

    fn bearer(&self) -> nest_sync::Result<String> {
        self.session.credential().ok_or(SyncError::AuthRequired)
    }

    async fn send(&self, method: Method, url: Url, authenticated: bool) -> nest_sync::Result<Response> {
        let mut request = self.http.request(method.clone(), url.clone());
        if authenticated {
            request = request.bearer_auth(self.bearer()?);
        }

        debug!(%method, %url, "sending request");
        let response = request.send().await.map_err(network_error)?;
        if response.status().is_success() {
            return Ok(response);
        }

        let status = response.status();
        let message = match response.json::<ErrorBody>().await {
            Ok(body) => body.detail,
            Err(_) => status.canonical_reason().unwrap_or("request failed").to_string(),
        };
        Err(SyncError::http(status.as_u16(), message))
    }

    async fn get_articles(&self, url: Url, authenticated: bool, saved: bool) -> nest_sync::Result<Vec<Article>> {
        let list: ArticleList = self
            .send(Method::GET, url, authenticated)
            .await?
            .json()
            .await
            .map_err(network_error)?;
        Ok(list.into_articles(saved))
    }
}

fn network_error(e: reqwest::Error) -> SyncError {
    SyncError::Network(e.to_string())
}

#[async_trait]
impl ArticleSource for RestClient {
    async fn fetch_page(
        &self,
        view: View,
        page: u32,
        page_size: usize,
        filter: &str,
    ) -> nest_sync::Result<Vec<Article>> {
        match view {
            View::Feed => {
                let mut params = vec![("page", page.to_string()), ("limit", page_size.to_string())];
                if !filter.is_empty() {
                    params.push(("category", filter.to_string()));
                }
                self.get_articles(self.url("/articles", &params)?, false, false)
                    .await
            }
            View::Search => {
                let params = [
                    ("q", filter.to_string()),
                    ("page", page.to_string()),
                    ("limit", page_size.to_string()),
                ];
                self.get_articles(self.url("/search", &params)?, false, false)
                    .await
            }
            View::Saved => {
                self.get_articles(self.url("/users/me/saved", &[])?, true, true)
                    .await
            }
            View::Personalized => {
                self.get_articles(self.url("/feed/personalized", &[])?, true, false)
                    .await
            }
        }
    }
}

#[async_trait]
impl SaveRemote for RestClient {
    async fn set_saved(&self, entity_id: &str, saved: bool) -> nest_sync::Result<()> {
        let method = if saved { Method::POST } else { Method::DELETE };
        let url = self.url("/users/me/saved", &[("article_url", entity_id.to_string())])?;
        self.send(method, url, true).await?;
        Ok(())
    }
}
