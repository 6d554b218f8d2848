pub mod comments_repo;
pub mod migrations;
pub mod pool;
pub mod quotes_repo;

pub use comments_repo::{
    adjust_comment_votes, delete_comment, insert_comment, list_comments,
    CommentsRepoError,
};
pub use migrations::run_migrations;
pub use pool::{connect_lazy, DbPool, DbPoolError};
pub use quotes_repo::{
    adjust_quote_votes, delete_quote, find_quote, insert_quote, list_quotes,
    new_record_id, QuotesRepoError,
};
