// Library exports for forum-client
// The `forum` binary and the integration tests both build on these modules

pub mod cache;
pub mod config;
pub mod error;
pub mod forum;
pub mod http;
pub mod models;
pub mod paths;
pub mod proxy;
pub mod session;
pub mod views;

pub use cache::{CacheEntry, RemoteCache, ResourceKey, Status, Subscription};
pub use error::{ClientError, ClientResult, ErrorKind};
pub use forum::{Forum, Screen};
pub use http::{ApiClient, Transport};
