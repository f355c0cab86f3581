pub mod feed;
pub mod item;

pub use feed::{CacheEntry, FeedTarget};
pub use item::{Item, TimelineItem};
