use serde::Serialize;

use super::{order::OrderIdx, truck::TruckIdx};

/// Part (or all) of an order's volume carried by one truck.
#[derive(Serialize, Debug, Clone, Copy, PartialEq)]
pub struct Delivery {
    pub order: OrderIdx,
    pub truck: TruckIdx,
    pub volume_m3: f64,
}
