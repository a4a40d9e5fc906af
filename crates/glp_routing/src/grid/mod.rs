pub mod grid_bounds;
pub mod obstacle;
pub mod obstacle_grid;
pub mod rasterize;
