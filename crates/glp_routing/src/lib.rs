pub mod cache;
pub mod clock;
pub mod grid;
pub mod point;
pub mod routing;
pub mod utils;
