//! Push event routing into the feed controller

mod common;

use common::{articles, new_article_frame, FakeSource};
use nest_sync::{
    decode, ChannelEvent, ClientEvent, EventRouter, FeedCursorController, PageOutcome,
    RouteOutcome, SessionContext, View,
};
use std::sync::Arc;
use tokio::sync::broadcast;

struct Fixture {
    source: Arc<FakeSource>,
    feed: Arc<FeedCursorController>,
    router: EventRouter,
    events: broadcast::Receiver<ClientEvent>,
}

fn fixture() -> Fixture {
    let source = Arc::new(FakeSource::new());
    let (tx, events) = broadcast::channel(256);
    let feed = Arc::new(FeedCursorController::new(
        source.clone(),
        Arc::new(SessionContext::new()),
        20,
        tx.clone(),
    ));
    let router = EventRouter::new(feed.clone(), tx);
    Fixture {
        source,
        feed,
        router,
        events,
    }
}

fn event(n: usize) -> ChannelEvent {
    decode(&new_article_frame(
        &format!("https://news.example/push/{}", n),
        &format!("Story {}", n),
    ))
    .unwrap()
}

fn announcements(events: &mut broadcast::Receiver<ClientEvent>) -> Vec<String> {
    let mut found = Vec::new();
    while let Ok(event) = events.try_recv() {
        if let ClientEvent::Announcement(text) = event {
            found.push(text);
        }
    }
    found
}

#[tokio::test]
async fn test_visible_feed_is_refreshed() {
    let mut fx = fixture();
    fx.source.respond(View::Feed, 1, Ok(articles("feed", 3)));

    let outcome = fx.router.route(&event(1), View::Feed).await.unwrap();
    assert!(matches!(
        outcome,
        RouteOutcome::Refreshed(PageOutcome::Loaded { page: 1, fetched: 3, .. })
    ));
    assert_eq!(fx.source.call_count(View::Feed), 1);
    assert_eq!(announcements(&mut fx.events), vec!["New article: Story 1"]);
}

#[tokio::test]
async fn test_hidden_feed_is_marked_stale() {
    let fx = fixture();

    let outcome = fx.router.route(&event(1), View::Saved).await.unwrap();
    assert_eq!(outcome, RouteOutcome::MarkedStale);
    assert_eq!(fx.source.call_count(View::Feed), 0);
    assert!(fx.feed.snapshot(View::Feed).stale);
    assert!(!fx.feed.snapshot(View::Saved).stale);
}

#[tokio::test]
async fn test_burst_is_announced_but_refreshed_once() {
    let mut fx = fixture();
    let burst: Vec<ChannelEvent> = (0..5).map(event).collect();

    let outcome = fx.router.route_all(&burst, View::Feed).await.unwrap();
    assert!(matches!(outcome, Some(RouteOutcome::Refreshed(_))));
    assert_eq!(fx.source.call_count(View::Feed), 1);
    assert_eq!(announcements(&mut fx.events).len(), 5);
}

#[tokio::test]
async fn test_empty_burst_does_nothing() {
    let mut fx = fixture();

    assert_eq!(fx.router.route_all(&[], View::Feed).await.unwrap(), None);
    assert_eq!(fx.source.call_count(View::Feed), 0);
    assert!(announcements(&mut fx.events).is_empty());
}
