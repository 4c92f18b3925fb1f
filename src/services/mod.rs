pub mod cookies;
pub mod drafts;
pub mod error;
pub mod inactivity;
pub mod library;
pub mod publish;
pub mod session;
pub mod store;
pub mod supabase_auth;
pub mod uploads;
pub mod youtube;
pub mod youtube_oauth;
