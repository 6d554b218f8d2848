pub mod auth;
pub mod moderation;
pub mod search_index;
