use std::{
    fs::File,
    io::{BufReader, Read},
    path::Path,
    sync::Arc,
};

use fxhash::FxHashSet;
use glp_routing::{
    grid::{grid_bounds::GridBounds, obstacle::Obstacle, obstacle_grid::ObstacleGrid},
    point::Point,
};
use jiff::{SignedDuration, Timestamp};
use serde::Deserialize;
use tracing::debug;

use crate::{
    error::ScenarioError,
    problem::{
        order::Order,
        planning_input::PlanningInput,
        truck::{Truck, TruckStatus},
        truck_type::TruckType,
        warehouse::{Warehouse, WarehouseStatus},
    },
};

#[derive(Deserialize)]
#[serde(deny_unknown_fields, rename = "PlanningScenario")]
pub struct JsonPlanningScenario {
    pub now: Timestamp,
    pub bounds: Option<GridBounds>,
    #[serde(default)]
    pub obstacles: Vec<Obstacle>,
    pub orders: Vec<JsonOrder>,
    pub trucks: Vec<JsonTruck>,
    pub warehouses: Vec<JsonWarehouse>,
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields, rename = "Order")]
pub struct JsonOrder {
    pub id: String,
    pub location: Point,
    pub volume_m3: f64,
    /// Defaults to the scenario's `now`
    pub registered_at: Option<Timestamp>,
    /// Hours between registration and the deadline
    pub allowed_hours: f64,
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields, rename = "Truck")]
pub struct JsonTruck {
    pub id: String,
    pub truck_type: TruckType,
    pub status: Option<TruckStatus>,
    pub position: Option<Point>,
    /// Defaults to a full tank
    pub fuel_gal: Option<f64>,
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields, rename = "Warehouse")]
pub struct JsonWarehouse {
    pub id: String,
    pub location: Point,
    pub capacity_m3: f64,
    pub principal: Option<bool>,
    pub status: Option<WarehouseStatus>,
}

/// Grid and planning input built from a scenario file.
pub struct Scenario {
    pub grid: Arc<ObstacleGrid>,
    pub input: PlanningInput,
}

impl JsonPlanningScenario {
    pub fn from_reader(reader: impl Read) -> Result<Self, ScenarioError> {
        Ok(serde_json::from_reader(reader)?)
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, ScenarioError> {
        let file = File::open(path)?;
        Self::from_reader(BufReader::new(file))
    }

    pub fn build(self) -> Result<Scenario, ScenarioError> {
        let now = self.now;

        let mut order_ids = FxHashSet::default();
        let orders = self
            .orders
            .into_iter()
            .map(|order| {
                if !order_ids.insert(order.id.clone()) {
                    return Err(ScenarioError::DuplicateId {
                        kind: "order",
                        id: order.id,
                    });
                }
                if !order.volume_m3.is_finite() || order.volume_m3 <= 0.0 {
                    return Err(ScenarioError::InvalidVolume(order.id));
                }
                if !order.allowed_hours.is_finite() || order.allowed_hours < 0.0 {
                    return Err(ScenarioError::InvalidDeadline(order.id));
                }
                let Ok(allowed) = SignedDuration::try_from_secs_f64(order.allowed_hours * 3600.0)
                else {
                    return Err(ScenarioError::InvalidDeadline(order.id));
                };

                Ok(Order::new(
                    order.id,
                    order.location,
                    order.volume_m3,
                    order.registered_at.unwrap_or(now),
                    allowed,
                ))
            })
            .collect::<Result<Vec<_>, _>>()?;

        let mut truck_ids = FxHashSet::default();
        let trucks = self
            .trucks
            .into_iter()
            .map(|truck| {
                if !truck_ids.insert(truck.id.clone()) {
                    return Err(ScenarioError::DuplicateId {
                        kind: "truck",
                        id: truck.id,
                    });
                }

                let mut built = Truck::new(truck.id.clone(), truck.truck_type)
                    .with_status(truck.status.unwrap_or_default());
                if let Some(position) = truck.position {
                    built = built.with_position(position);
                }
                if let Some(fuel) = truck.fuel_gal {
                    if !fuel.is_finite() || fuel < 0.0 || fuel > built.fuel_tank_capacity_gal() {
                        return Err(ScenarioError::InvalidFuel(truck.id));
                    }
                    built = built.with_fuel(fuel);
                }
                Ok(built)
            })
            .collect::<Result<Vec<_>, _>>()?;

        let mut warehouse_ids = FxHashSet::default();
        let warehouses = self
            .warehouses
            .into_iter()
            .map(|warehouse| {
                if !warehouse_ids.insert(warehouse.id.clone()) {
                    return Err(ScenarioError::DuplicateId {
                        kind: "warehouse",
                        id: warehouse.id,
                    });
                }
                if !warehouse.capacity_m3.is_finite() || warehouse.capacity_m3 < 0.0 {
                    return Err(ScenarioError::InvalidWarehouseCapacity(warehouse.id));
                }

                let mut built = Warehouse::new(warehouse.id, warehouse.location, warehouse.capacity_m3)
                    .with_status(warehouse.status.unwrap_or_default());
                if warehouse.principal.unwrap_or(false) {
                    built = built.principal();
                }
                Ok(built)
            })
            .collect::<Result<Vec<_>, _>>()?;

        let grid = ObstacleGrid::with_obstacles(
            self.bounds.unwrap_or_default(),
            Some(now),
            self.obstacles,
        );

        debug!(
            orders = orders.len(),
            trucks = trucks.len(),
            warehouses = warehouses.len(),
            obstacles = grid.obstacle_count(),
            "Scenario built"
        );

        Ok(Scenario {
            grid: Arc::new(grid),
            input: PlanningInput::new(now, orders, trucks, warehouses),
        })
    }
}
