pub mod stats_client;
pub mod telegram_client;
