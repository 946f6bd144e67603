use async_trait::async_trait;
use rand::seq::SliceRandom;
use tokio::sync::RwLock;

use super::feed_models::{FeedError, FeedItem, FeedSummary};
use super::feed_registry::{FeedRegistry, FeedTarget};
use super::formatting::PostDisplay;

/// Posts fetched per feed on every poll.
pub const AUTO_POST_LIMIT: usize = 5;

/// Posts considered when picking a random one on demand.
pub const RANDOM_FETCH_WINDOW: usize = 10;

/// The content platform, reduced to the one call the service needs.
#[async_trait]
pub trait FeedSource: Send + Sync {
    /// Newest posts of a subreddit, newest first, at most `limit` of them.
    async fn fetch_new(&self, feed: &str, limit: usize) -> Result<Vec<FeedItem>, FeedError>;
}

/// Where relayed posts go. The Discord layer implements this over the HTTP client.
#[async_trait]
pub trait PostSink: Send + Sync {
    async fn deliver(&self, channel_id: u64, post: &PostDisplay) -> Result<(), FeedError>;
}

/// Outcome of one pass over the registry.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TickReport {
    pub feeds_polled: usize,
    pub posts_delivered: usize,
    pub feeds_failed: usize,
}

/// Owns the registry and runs both the command operations and the poll tick.
///
/// The lock is never held across a network call, so commands stay responsive
/// while a tick is fetching.
pub struct FeedService<C: FeedSource> {
    source: C,
    registry: RwLock<FeedRegistry>,
}

impl<C: FeedSource> FeedService<C> {
    pub fn new(source: C) -> Self {
        Self {
            source,
            registry: RwLock::new(FeedRegistry::new()),
        }
    }

    pub async fn add_feed(&self, name: &str) -> Result<String, FeedError> {
        self.registry.write().await.add(name)
    }

    pub async fn remove_feed(&self, name: &str) -> Result<String, FeedError> {
        self.registry.write().await.remove(name)
    }

    pub async fn list_feeds(&self) -> Vec<FeedSummary> {
        self.registry.read().await.list()
    }

    pub async fn set_destination(&self, name: &str, channel_id: u64) -> Result<String, FeedError> {
        self.registry.write().await.set_destination(name, channel_id)
    }

    pub async fn set_enabled(&self, name: &str, enabled: bool) -> Result<String, FeedError> {
        self.registry.write().await.set_enabled(name, enabled)
    }

    /// Normalized name of a registered feed, or `NotFound`.
    pub async fn resolve(&self, name: &str) -> Result<String, FeedError> {
        self.registry.read().await.resolve(name)
    }

    /// Pick one of the latest posts at random. Seen ids are neither read nor written.
    ///
    /// Returns `Ok(None)` when the subreddit currently has no posts.
    pub async fn fetch_random(&self, name: &str) -> Result<Option<PostDisplay>, FeedError> {
        let name = self.resolve(name).await?;
        let items = self.source.fetch_new(&name, RANDOM_FETCH_WINDOW).await?;

        Ok(items
            .choose(&mut rand::thread_rng())
            .map(PostDisplay::from_item))
    }

    /// Relay unseen posts for every enabled feed with a channel.
    ///
    /// A failure on one feed is logged and the pass moves on to the next feed.
    pub async fn poll_once<S: PostSink>(&self, sink: &S) -> TickReport {
        let feeds = self.registry.read().await.eligible();
        let mut report = TickReport::default();

        for target in feeds {
            report.feeds_polled += 1;

            match self.relay_feed(&target, sink).await {
                Ok(delivered) => {
                    if delivered > 0 {
                        tracing::debug!(
                            feed = %target.name,
                            channel_id = target.channel_id,
                            delivered,
                            "Relayed new posts"
                        );
                    }
                    report.posts_delivered += delivered;
                }
                Err(err) => {
                    report.feeds_failed += 1;
                    tracing::warn!(
                        feed = %target.name,
                        channel_id = target.channel_id,
                        error = %err,
                        "Failed to relay posts for subreddit"
                    );
                }
            }
        }

        report
    }

    async fn relay_feed<S: PostSink>(
        &self,
        target: &FeedTarget,
        sink: &S,
    ) -> Result<usize, FeedError> {
        let items = self.source.fetch_new(&target.name, AUTO_POST_LIMIT).await?;
        let mut delivered = 0;

        for item in items {
            // The registry may have changed while we were fetching or sending
            if !self.registry.read().await.should_relay(target, &item.id) {
                continue;
            }

            // Only mark after a successful send so a failed post is retried next tick
            sink.deliver(target.channel_id, &PostDisplay::from_item(&item)).await?;
            self.registry.write().await.mark_seen(target, &item.id);
            delivered += 1;
        }

        Ok(delivered)
    }

    #[cfg(test)]
    pub async fn seen_count(&self, name: &str) -> Option<usize> {
        self.registry.read().await.get(name).map(|entry| entry.seen.len())
    }

    #[cfg(test)]
    pub fn source(&self) -> &C {
        &self.source
    }
}


#[cfg(test)]
mod tests {
    use super::test_support::{post, FakeSource, GatedSource, RecordingSink};
    use super::*;
    use std::sync::Arc;

    async fn enabled_feed(service: &FeedService<FakeSource>, name: &str, channel_id: u64) {
        service.add_feed(name).await.unwrap();
        service.set_destination(name, channel_id).await.unwrap();
        service.set_enabled(name, true).await.unwrap();
    }

    #[tokio::test]
    async fn test_only_unseen_posts_are_relayed_in_order() {
        let service = FeedService::new(FakeSource::default());
        let sink = RecordingSink::default();
        enabled_feed(&service, "rust", 1).await;

        service.source().set_posts("rust", vec![post("old")]);
        service.poll_once(&sink).await;
        assert_eq!(service.seen_count("rust").await, Some(1));

        service
            .source()
            .set_posts("rust", vec![post("new2"), post("new1"), post("old")]);
        let report = service.poll_once(&sink).await;

        assert_eq!(report.posts_delivered, 2);
        assert_eq!(
            sink.titles_for(1),
            vec!["Post old", "Post new2", "Post new1"]
        );
        assert_eq!(service.seen_count("rust").await, Some(3));
    }

    #[tokio::test]
    async fn test_repeated_tick_delivers_nothing() {
        let service = FeedService::new(FakeSource::default());
        let sink = RecordingSink::default();
        enabled_feed(&service, "rust", 1).await;
        service.source().set_posts("rust", vec![post("a"), post("b")]);

        service.poll_once(&sink).await;
        let second = service.poll_once(&sink).await;

        assert_eq!(second.posts_delivered, 0);
        assert_eq!(sink.total(), 2);
    }

    #[tokio::test]
    async fn test_disabled_feed_is_skipped() {
        let service = FeedService::new(FakeSource::default());
        let sink = RecordingSink::default();
        enabled_feed(&service, "sports", 10).await;
        service.add_feed("news").await.unwrap();

        service.source().set_posts("sports", vec![post("s1"), post("s2")]);
        service.source().set_posts("news", vec![post("n1")]);

        let report = service.poll_once(&sink).await;

        assert_eq!(report.feeds_polled, 1);
        assert_eq!(sink.titles_for(10), vec!["Post s1", "Post s2"]);
        assert_eq!(sink.total(), 2);
        assert_eq!(service.seen_count("sports").await, Some(2));
        assert_eq!(service.seen_count("news").await, Some(0));
        assert_eq!(service.source().fetch_count(), 1);
    }

    #[tokio::test]
    async fn test_enabled_without_channel_is_inert() {
        let service = FeedService::new(FakeSource::default());
        let sink = RecordingSink::default();
        service.add_feed("pics").await.unwrap();
        service.set_enabled("pics", true).await.unwrap();
        service.source().set_posts("pics", vec![post("p1")]);

        let report = service.poll_once(&sink).await;

        assert_eq!(report, TickReport::default());
        assert_eq!(service.source().fetch_count(), 0);
    }

    #[tokio::test]
    async fn test_failing_feed_does_not_block_others() {
        let service = FeedService::new(FakeSource::default());
        let sink = RecordingSink::default();
        enabled_feed(&service, "broken", 1).await;
        enabled_feed(&service, "working", 2).await;
        service.source().set_failure("broken", "503 Service Unavailable");
        service.source().set_posts("working", vec![post("w1"), post("w2")]);

        let report = service.poll_once(&sink).await;

        assert_eq!(report.feeds_failed, 1);
        assert_eq!(report.posts_delivered, 2);
        assert_eq!(sink.titles_for(2), vec!["Post w1", "Post w2"]);
    }

    #[tokio::test]
    async fn test_failed_delivery_is_retried_next_tick() {
        let service = FeedService::new(FakeSource::default());
        let sink = RecordingSink::default();
        enabled_feed(&service, "rust", 5).await;
        service.source().set_posts("rust", vec![post("a")]);
        sink.failing.lock().unwrap().push(5);

        let report = service.poll_once(&sink).await;
        assert_eq!(report.feeds_failed, 1);
        assert_eq!(service.seen_count("rust").await, Some(0));

        sink.failing.lock().unwrap().clear();
        let report = service.poll_once(&sink).await;
        assert_eq!(report.posts_delivered, 1);
        assert_eq!(service.seen_count("rust").await, Some(1));
    }

    #[tokio::test]
    async fn test_only_auto_post_limit_is_fetched() {
        let service = FeedService::new(FakeSource::default());
        let sink = RecordingSink::default();
        enabled_feed(&service, "busy", 3).await;
        let posts = (0..8).map(|i| post(&format!("p{i}"))).collect();
        service.source().set_posts("busy", posts);

        let report = service.poll_once(&sink).await;
        assert_eq!(report.posts_delivered, AUTO_POST_LIMIT);
    }

    #[tokio::test]
    async fn test_random_fetch_leaves_seen_ids_alone() {
        let service = FeedService::new(FakeSource::default());
        service.add_feed("rust").await.unwrap();
        service
            .source()
            .set_posts("rust", vec![post("a"), post("b"), post("c")]);

        for _ in 0..5 {
            let picked = service.fetch_random("R/Rust").await.unwrap().unwrap();
            assert!(["Post a", "Post b", "Post c"].contains(&picked.title.as_str()));
        }

        assert_eq!(service.seen_count("rust").await, Some(0));
    }

    #[tokio::test]
    async fn test_random_fetch_requires_registration() {
        let service = FeedService::new(FakeSource::default());
        service.source().set_posts("rust", vec![post("a")]);

        let result = service.fetch_random("rust").await;
        assert!(matches!(result, Err(FeedError::NotFound(_))));
        assert_eq!(service.source().fetch_count(), 0);
    }

    #[tokio::test]
    async fn test_random_fetch_on_empty_feed() {
        let service = FeedService::new(FakeSource::default());
        service.add_feed("quiet").await.unwrap();
        service.source().set_posts("quiet", Vec::new());

        assert_eq!(service.fetch_random("quiet").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_removed_feed_stops_relaying() {
        let service = FeedService::new(FakeSource::default());
        let sink = RecordingSink::default();
        enabled_feed(&service, "rust", 1).await;
        service.source().set_posts("rust", vec![post("a")]);

        service.remove_feed("rust").await.unwrap();
        let report = service.poll_once(&sink).await;

        assert_eq!(report.feeds_polled, 0);
        assert_eq!(service.seen_count("rust").await, None);
    }

    #[tokio::test]
    async fn test_feed_replaced_mid_fetch_gets_nothing() {
        let service = Arc::new(FeedService::new(GatedSource::default()));
        let sink = Arc::new(RecordingSink::default());
        service.add_feed("rust").await.unwrap();
        service.set_destination("rust", 1).await.unwrap();
        service.set_enabled("rust", true).await.unwrap();
        *service.source().posts.lock().unwrap() = vec![post("x1"), post("x2")];

        let tick = tokio::spawn({
            let service = Arc::clone(&service);
            let sink = Arc::clone(&sink);
            async move { service.poll_once(&sink).await }
        });

        service.source().entered.notified().await;
        service.remove_feed("rust").await.unwrap();
        service.add_feed("rust").await.unwrap();
        service.source().release.notify_one();

        let report = tick.await.unwrap();
        assert_eq!(report.feeds_polled, 1);
        assert_eq!(report.posts_delivered, 0);
        assert_eq!(sink.total(), 0);
        assert_eq!(service.seen_count("rust").await, Some(0));

        let listed = service.list_feeds().await;
        assert!(!listed[0].enabled);
        assert_eq!(listed[0].channel_id, None);
    }

    #[tokio::test]
    async fn test_feed_disabled_mid_fetch_gets_nothing() {
        let service = Arc::new(FeedService::new(GatedSource::default()));
        let sink = Arc::new(RecordingSink::default());
        service.add_feed("rust").await.unwrap();
        service.set_destination("rust", 1).await.unwrap();
        service.set_enabled("rust", true).await.unwrap();
        *service.source().posts.lock().unwrap() = vec![post("x1")];

        let tick = tokio::spawn({
            let service = Arc::clone(&service);
            let sink = Arc::clone(&sink);
            async move { service.poll_once(&sink).await }
        });

        service.source().entered.notified().await;
        service.set_enabled("rust", false).await.unwrap();
        service.source().release.notify_one();

        assert_eq!(tick.await.unwrap().posts_delivered, 0);
        assert_eq!(sink.total(), 0);
        assert_eq!(service.seen_count("rust").await, Some(0));
    }
}
