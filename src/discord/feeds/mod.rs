// Discord side of the subreddit feed: embeds and channel delivery.

#[path = "embeds.rs"]
pub mod embeds;

#[path = "channel_sink.rs"]
pub mod channel_sink;

pub use channel_sink::ChannelPostSink;
pub use embeds::build_post_embed;
