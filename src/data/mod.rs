//! Data sources: the occupancy feed and its timestamp format.

pub mod feed;
pub mod timestamp;

pub use feed::{FeedCache, FeedClient, LoadedFeed, feed_url_from_env, parse_feed};
pub use timestamp::{TimestampParser, parse_records};
