//! Domain value objects.

mod channel_url;
mod dedup_policy;
mod video_id;

pub use channel_url::ChannelUrl;
pub use dedup_policy::DedupPolicy;
pub use video_id::VideoId;
