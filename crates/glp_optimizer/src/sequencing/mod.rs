pub mod ant_colony;
pub mod ant_colony_params;
pub mod delivery_sequencer;
pub mod distance_matrix;
