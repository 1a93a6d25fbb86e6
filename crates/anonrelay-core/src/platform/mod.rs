//! Chat-platform abstractions (Telegram today; Discord/Slack could fit the same port).

pub mod port;
pub mod timeout;
pub mod types;
