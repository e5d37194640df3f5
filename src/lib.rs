//! Quill: client for the Quill blogging API.
//!
//! The core is [`client::AuthenticatedClient`], which attaches the bearer
//! token to every request and, when the server answers 401, refreshes the
//! token once for all concurrent callers before replaying their requests.
//! Typed services over it cover articles, comments, stars, tags, categories
//! and users, and keep a client-side query cache consistent with mutations.
//!
//! # Quick Start
//!
//! ```no_run
//! use std::sync::Arc;
//! use quill::prelude::*;
//!
//! # async fn example() -> quill::error::Result<()> {
//! let config = ClientConfig::from_env()?;
//! let services = Services::new(Arc::new(AuthenticatedClient::from_config(&config)?));
//! services.auth.login("ada@example.com", "hunter22").await?;
//! let page = services.articles.list(&ArticleQuery::default()).await?;
//! println!("{} articles", page.pagination.total_items);
//! # Ok(())
//! # }
//! ```

pub mod auth;
pub mod cache;
pub mod client;
pub mod config;
pub mod error;
pub mod pagination;
pub mod prelude;
pub mod services;
pub mod types;

#[cfg(feature = "cli")]
pub mod cli;
