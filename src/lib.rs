//! Client library behind the `taskapp` binary.
//!
//! The pure modules ([`recurrence`], [`selectors`], [`validate`], [`stats`],
//! [`notifications`]) hold the domain rules and can be used without a
//! backend. [`workspace::Workspace`] layers the persistent query cache over
//! any [`api::TaskApi`], and [`client::ApiClient`] is the HTTP implementation.

pub mod api;
pub mod cache;
pub mod client;
pub mod commands;
pub mod config;
pub mod error;
pub mod models;
pub mod notifications;
pub mod recurrence;
pub mod selectors;
pub mod stats;
pub mod storage;
pub mod validate;
pub mod workspace;
