use glp_routing::point::Point;
use serde::{Deserialize, Serialize};

use crate::define_index_newtype;

define_index_newtype!(WarehouseIdx, Warehouse);

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum WarehouseStatus {
    #[default]
    Operational,
    Degraded,
    Closed,
}

impl WarehouseStatus {
    /// Weight of the status in the return warehouse score.
    pub fn factor(&self) -> f64 {
        match self {
            WarehouseStatus::Operational => 1.0,
            WarehouseStatus::Degraded => 0.5,
            WarehouseStatus::Closed => 0.0,
        }
    }
}

#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct Warehouse {
    id: String,
    location: Point,
    capacity_m3: f64,
    principal: bool,
    status: WarehouseStatus,
}

impl Warehouse {
    pub fn new(id: impl Into<String>, location: Point, capacity_m3: f64) -> Self {
        Warehouse {
            id: id.into(),
            location,
            capacity_m3,
            principal: false,
            status: WarehouseStatus::Operational,
        }
    }

    pub fn principal(mut self) -> Self {
        self.principal = true;
        self
    }

    pub fn with_status(mut self, status: WarehouseStatus) -> Self {
        self.status = status;
        self
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn location(&self) -> Point {
        self.location
    }

    pub fn capacity_m3(&self) -> f64 {
        self.capacity_m3
    }

    pub fn is_principal(&self) -> bool {
        self.principal
    }

    pub fn status(&self) -> WarehouseStatus {
        self.status
    }

    pub fn is_open(&self) -> bool {
        self.status != WarehouseStatus::Closed
    }
}
