pub mod tag;
pub mod time_range;
pub mod vote;
