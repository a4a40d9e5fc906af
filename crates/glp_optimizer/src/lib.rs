pub mod distance;
pub mod error;
pub mod fuel;
pub mod json;
pub mod packing;
pub mod planner;
pub mod problem;
pub mod sequencing;
mod utils;
pub mod validation;

#[cfg(test)]
pub(crate) mod test_utils;
