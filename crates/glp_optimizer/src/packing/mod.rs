pub mod order_packer;
pub mod packing_params;
pub mod packing_result;
pub mod packing_strategy;
