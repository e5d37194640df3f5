//! Wire types for the blog API.

pub mod api;
pub mod article;
pub mod comment;
pub mod taxonomy;
pub mod user;

pub use api::*;
pub use article::*;
pub use comment::*;
pub use taxonomy::*;
pub use user::*;
