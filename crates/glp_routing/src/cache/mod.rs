pub mod cache_params;
pub mod cache_statistics;
pub mod path_cache;
pub mod refresh_queue;
pub mod refresher;
