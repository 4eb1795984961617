//! recipe-api - Recipe and tag REST backend
//!
//! Users register with an email address, exchange credentials for an API
//! token, and manage their own recipes and tags. Start-up can be gated on
//! the database accepting connections (see [`startup`]).

pub mod api;
pub mod config;
pub mod db;
pub mod models;
pub mod services;
pub mod startup;
