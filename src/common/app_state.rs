use std::sync::Arc;

use crate::{client::telegram_client::TelegramClient, stats::service::StatsService};

pub struct AppState {
    stats: StatsService,
    telegram: TelegramClient,
}

impl AppState {
    pub fn new(stats: StatsService, telegram: TelegramClient) -> Arc<Self> {
        Arc::new(Self { stats, telegram })
    }

    pub fn get_stats(&self) -> &StatsService {
        &self.stats
    }

    pub fn get_telegram(&self) -> &TelegramClient {
        &self.telegram
    }
}
