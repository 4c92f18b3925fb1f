//! Domain layer - DB queries grouped by table
//!
//! All functions use the generic Executor pattern, allowing them to work with
//! both `&PgPool` (for standalone queries) and `&mut PgConnection` (for transactions).

pub mod accounts;
pub mod posts;
pub mod profiles;
pub mod videos;
