pub mod app;
pub mod auth;
pub mod avatars;
pub mod client;
pub mod config;
pub mod error;
pub mod groups;
pub mod state;
pub mod storage;
pub mod users;
pub mod validation;
