pub mod comments;
pub mod identity;
pub mod quotes;
pub mod search;
pub mod thread_view;
