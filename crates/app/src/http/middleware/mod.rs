pub mod admin_auth;
pub mod query_limit;
pub mod visitor_cookie;
