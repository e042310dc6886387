pub mod db;
pub mod error;
pub mod file_store;
pub mod handlers;
pub mod models;
pub mod service;
pub mod store;
pub mod supabase;
