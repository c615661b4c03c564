pub mod auth;
pub mod chat;
pub mod convert;
pub mod error;
pub mod polls;
pub mod posts;
