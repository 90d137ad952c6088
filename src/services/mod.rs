//! Services layer - Business logic
//!
//! Services sit between the HTTP handlers and the repositories. They enforce
//! the catalog rules, moderation and account validation, and translate
//! repository failures into their own error enums.

pub mod catalog;
pub mod comment;
pub mod favorite;
pub mod humanize;
pub mod password;
pub mod profile;
pub mod user;

pub use catalog::{CatalogError, CatalogService, EntryDetail};
pub use comment::{CommentError, CommentService};
pub use favorite::{FavoriteError, FavoriteLists, FavoriteService};
pub use humanize::{naturaltime, naturaltime_at};
pub use password::{hash_password, verify_password};
pub use profile::{ProfileError, ProfileService};
pub use user::{LoginInput, RegisterInput, UserService, UserServiceError};
