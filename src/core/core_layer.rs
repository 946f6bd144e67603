// The core module contains all business logic.
// Each feature gets its own submodule.

#[path = "feeds/mod.rs"]
pub mod feeds;
