//! HTTP Routes

pub mod chat;
