pub mod threads;
pub mod time;
pub mod timeout_collector;
