pub mod context;
pub mod dictionary;
pub mod logging;
pub mod parallel;
pub mod search;
