use std::sync::Arc;

use glp_routing::point::Point;
use jiff::SignedDuration;
use serde::Serialize;

use super::{order::OrderIdx, warehouse::WarehouseIdx};

#[derive(Serialize, Debug, Clone, Copy, PartialEq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RouteSegmentKind {
    /// Drive to an order and unload `volume_m3` there.
    Delivery { order: OrderIdx, volume_m3: f64 },
    ReturnToWarehouse { warehouse: WarehouseIdx },
    /// Repositioning without unloading, e.g. to load at a warehouse first.
    Move { warehouse: Option<WarehouseIdx> },
}

#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct RouteSegment {
    pub origin: Point,
    pub destination: Point,
    pub kind: RouteSegmentKind,
    /// Empty when no path was found, the distance is then a straight estimate
    pub path: Arc<[Point]>,
    pub distance_km: f64,
    pub travel_time: SignedDuration,
    pub fuel_consumed_gal: f64,
    pub weight_before_ton: f64,
    pub weight_after_ton: f64,
}

impl RouteSegment {
    pub fn has_path(&self) -> bool {
        !self.path.is_empty()
    }

    pub fn delivery(&self) -> Option<(OrderIdx, f64)> {
        match self.kind {
            RouteSegmentKind::Delivery { order, volume_m3 } => Some((order, volume_m3)),
            _ => None,
        }
    }

    pub fn is_return(&self) -> bool {
        matches!(self.kind, RouteSegmentKind::ReturnToWarehouse { .. })
    }
}
