pub mod api;
pub mod config;
pub mod entities;
pub mod error;
pub mod external;
pub mod feed;
pub mod server;
pub mod transport;

pub use feed::{Diagnostics, JourneyFeedClient, SubscriptionHandle};
