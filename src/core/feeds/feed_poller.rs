// Background loop that runs `FeedService::poll_once` on a fixed interval.
//
// The first pass happens one full interval after spawning. Cancelling the
// token stops future passes; a pass that already started runs to the end.

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

use super::feed_service::{FeedService, FeedSource, PostSink};

pub fn spawn_poller<C, S>(
    service: Arc<FeedService<C>>,
    sink: S,
    period: Duration,
    shutdown: CancellationToken,
) -> JoinHandle<()>
where
    C: FeedSource + 'static,
    S: PostSink + 'static,
{
    tokio::spawn(async move {
        let mut ticker = interval_at(Instant::now() + period, period);
        // A slow pass pushes the schedule back instead of firing a burst of catch-up ticks
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        tracing::info!(interval_secs = period.as_secs(), "Subreddit poller started");

        loop {
            tokio::select! {
                _ = shutdown.cancelled() => break,
                _ = ticker.tick() => {}
            }

            let report = service.poll_once(&sink).await;
            if report.feeds_polled == 0 {
                tracing::debug!("No enabled subreddits to poll");
            } else {
                tracing::info!(
                    feeds = report.feeds_polled,
                    delivered = report.posts_delivered,
                    failed = report.feeds_failed,
                    "Subreddit poll finished"
                );
            }
        }

        tracing::info!("Subreddit poller stopped");
    })
}
