//! filevault - personal cloud file storage
//!
//! Users register, build a tree of folders, upload files against a byte
//! quota and preview or download them through a JSON API.

pub mod auth;
pub mod config;
pub mod datetime;
pub mod db;
pub mod error;
pub mod file;
pub mod logging;
pub mod store;
pub mod web;

pub use config::Config;
pub use db::Database;
pub use error::{Result, VaultError};
