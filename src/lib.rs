// Clone Finder: duplicate detection and partner-post tracking for a reddit
// moderation queue.
//
// This is the library root. Each module corresponds to one part of the
// polling cycle.

pub mod clones;
pub mod config;
pub mod cycle;
pub mod feed;
pub mod modqueue;
pub mod output;
pub mod post;
pub mod reddit;
pub mod roster;
pub mod status;
pub mod tracker;
