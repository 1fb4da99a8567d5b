//! # bbforum - a forum client with bulletin-board markup
//!
//! bbforum talks to a forum's REST backend: it lists topics, posts, edits and deletes
//! messages, signs users in and out, and lets administrators manage accounts. Message
//! bodies are written in a small shorthand markup (`[b]`, `[i]`, `[u]`) that is translated
//! to display tags before rendering.
//!
//! ## Features
//!
//! - **Markup translation**: [`markup::translate`] turns `[b]bold[/b]` into `<b>bold</b>`
//!   and leaves every other byte alone.
//! - **Backend client**: [`api::ForumApi`] with a `reqwest` implementation and per-request
//!   timeouts.
//! - **Session memory**: the signed-in user survives restarts in a locked JSON file.
//! - **Shared state**: who is signed in and the user list, observable through scoped
//!   subscriptions.
//! - **Form validation**: length rules plus a debounced, cancellable unique-name check.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use bbforum::api::HttpForumApi;
//! use bbforum::config::Config;
//! use bbforum::session::SessionStore;
//! use bbforum::state::AppState;
//! use bbforum::ui::{ConsoleNotifier, StdinConfirm};
//! use bbforum::views::{TopicView, ViewContext};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = Config::load("bbforum.toml").await?;
//!     let api = Arc::new(HttpForumApi::new(&config.api)?);
//!     let state = Arc::new(AppState::new(SessionStore::new(&config.session.path)));
//!     state.restore();
//!
//!     let ctx = ViewContext::new(api, state, ConsoleNotifier, StdinConfirm).configured(&config);
//!     let mut view = TopicView::new(ctx);
//!     view.open(1).await?;
//!     for message in view.rendered() {
//!         println!("{}: {}", message.author, message.html);
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ## Module Organization
//!
//! - [`markup`] - shorthand-to-display tag translation
//! - [`models`] - wire records (users, topics, messages)
//! - [`api`] - REST backend client
//! - [`session`] - on-disk memory of the signed-in user
//! - [`state`] - shared application state and subscriptions
//! - [`validation`] - form rules and the unique-name check
//! - [`ui`] - notices and confirmations
//! - [`views`] - topic, user management and account controllers
//! - [`config`] - TOML configuration
//! - [`logutil`] - log-safe rendering of user content

pub mod api;
pub mod config;
pub mod logutil;
pub mod markup;
pub mod models;
pub mod session;
pub mod state;
pub mod ui;
pub mod validation;
pub mod views;
