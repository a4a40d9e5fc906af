pub mod fuel_model;
pub mod fuel_params;
pub mod warehouse_selection;
