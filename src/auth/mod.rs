//! Access token, its persistence, the navigation seam, and the session service.

pub mod error;
pub mod navigator;
pub mod service;
pub mod store;
pub mod token;

pub use error::StorageError;
pub use navigator::{Navigator, NoopNavigator, RouteTracker};
pub use service::AuthService;
pub use store::{FileTokenStorage, MemoryTokenStorage, TokenStorage, TokenStore};
pub use token::AccessToken;
