//! Data models
//!
//! Plain structs read from database rows:
//! - Catalog entries (characters, comics, series) and their appearances
//! - Comments, favorites and profile data
//! - Users and sessions

mod appearance;
mod catalog;
mod comment;
mod favorite;
mod profile;
mod session;
mod user;

pub use appearance::{Appearance, CreateAppearanceInput, WorkKind};
pub use catalog::{CatalogCounts, CatalogKind, Entry, EntryInput};
pub use comment::{Comment, CommentFilter};
pub use favorite::Favorite;
pub use profile::{gravatar_url, UpdateUserDataInput, UserData};
pub use session::Session;
pub use user::{User, UserRole};
