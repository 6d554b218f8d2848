pub mod import;
pub mod search_index;
