mod bot;
mod identity;
mod stats_service;
mod support;
