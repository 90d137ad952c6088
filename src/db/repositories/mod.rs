//! Database repositories
//!
//! Repository pattern implementations for database access.
//! Each repository dispatches to SQLite or MySQL based on the pool driver.

pub mod appearance;
pub mod catalog;
pub mod comment;
pub mod favorite;
pub mod profile;
pub mod session;
pub mod user;

pub use appearance::{AppearanceRepository, SqlxAppearanceRepository};
pub use catalog::{CatalogRepository, SqlxCatalogRepository};
pub use comment::{CommentRepository, SqlxCommentRepository};
pub use favorite::{FavoriteRepository, SqlxFavoriteRepository};
pub use profile::{ProfileRepository, SqlxProfileRepository};
pub use session::{SessionRepository, SqlxSessionRepository};
pub use user::{is_unique_violation, SqlxUserRepository, UserRepository};

/// Escape character used by every `LIKE ... ESCAPE` clause
pub(crate) const LIKE_ESCAPE: char = '!';

/// Lower-cased `%term%` pattern with `%`, `_` and the escape character
/// matched literally. Pair with `ESCAPE '!'`.
pub(crate) fn contains_pattern(term: &str) -> String {
    let mut pattern = String::with_capacity(term.len() + 2);
    pattern.push('%');
    for c in term.to_lowercase().chars() {
        if matches!(c, '%' | '_') || c == LIKE_ESCAPE {
            pattern.push(LIKE_ESCAPE);
        }
        pattern.push(c);
    }
    pattern.push('%');
    pattern
}
