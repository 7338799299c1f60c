//! # Codyssey - an educational adventure game and its progress server
//!
//! The Codyssey teaches programming through a small top-down adventure: the
//! player walks between NPCs, talks through dialogue chains, trades items and
//! completes subquests. This crate holds both halves of the game:
//!
//! - **Progress server**: an axum REST API over a sled store holding the
//!   content tables, player inventory and progress, plus accounts and sessions.
//! - **Game client**: a content snapshot, the dialogue engine and the scene
//!   controller, with a line-oriented terminal front end.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use codyssey::api::ApiServer;
//! use codyssey::config::Config;
//! use codyssey::content::{starter_content, ContentStoreBuilder};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = Config::load("config.toml").await?;
//!     let store = ContentStoreBuilder::new(config.storage.db_path())
//!         .with_seed(starter_content()?)
//!         .open()?;
//!     ApiServer::new(&config, Arc::new(store))?.run().await
//! }
//! ```
//!
//! ## Module Organization
//!
//! - [`content`] - Record types, the sled-backed store, seeds, inventory and progress rules
//! - [`auth`] - Accounts, password hashing and sessions
//! - [`api`] - HTTP routes, the session guard and response envelope
//! - [`game`] - Dialogue engine, NPC placement, scene controller and terminal front end
//! - [`config`] - Configuration management and validation
//! - [`validation`] - Username, profile and id validation
//! - [`logutil`] - Helpers for logging user-provided text

pub mod api;
pub mod auth;
pub mod config;
pub mod content;
pub mod game;
pub mod logutil;
pub mod validation;
