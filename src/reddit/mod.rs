// Reddit API client: OAuth login, listings, moderation actions.
//
// Implements `FeedSource` over reddit's OAuth API. Each submodule handles
// one concern of the API surface.

pub mod client;
pub mod listing;
pub mod rate_limit;
