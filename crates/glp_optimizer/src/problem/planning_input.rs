use glp_routing::point::Point;
use jiff::Timestamp;

use super::{
    order::{Order, OrderIdx},
    truck::{Truck, TruckIdx},
    warehouse::{Warehouse, WarehouseIdx},
};

/// Snapshot of orders, trucks and warehouses for one planning run.
///
/// Order priorities are frozen at `now` so that every stage of the run sees
/// the same urgency.
#[derive(Debug, Clone)]
pub struct PlanningInput {
    now: Timestamp,
    orders: Vec<Order>,
    trucks: Vec<Truck>,
    warehouses: Vec<Warehouse>,
    priorities: Vec<u32>,
}

impl PlanningInput {
    pub fn new(
        now: Timestamp,
        orders: Vec<Order>,
        trucks: Vec<Truck>,
        warehouses: Vec<Warehouse>,
    ) -> Self {
        let priorities = orders.iter().map(|order| order.priority(now)).collect();
        PlanningInput {
            now,
            orders,
            trucks,
            warehouses,
            priorities,
        }
    }

    pub fn now(&self) -> Timestamp {
        self.now
    }

    pub fn orders(&self) -> &[Order] {
        &self.orders
    }

    pub fn trucks(&self) -> &[Truck] {
        &self.trucks
    }

    pub fn warehouses(&self) -> &[Warehouse] {
        &self.warehouses
    }

    pub fn order(&self, idx: OrderIdx) -> &Order {
        &self.orders[idx]
    }

    pub fn truck(&self, idx: TruckIdx) -> &Truck {
        &self.trucks[idx]
    }

    pub fn warehouse(&self, idx: WarehouseIdx) -> &Warehouse {
        &self.warehouses[idx]
    }

    pub fn priority(&self, idx: OrderIdx) -> u32 {
        self.priorities[idx.get()]
    }

    pub fn order_indices(&self) -> impl Iterator<Item = OrderIdx> {
        OrderIdx::all(self.orders.len())
    }

    pub fn available_trucks(&self) -> impl Iterator<Item = TruckIdx> + '_ {
        TruckIdx::all(self.trucks.len()).filter(|&idx| self.truck(idx).is_available())
    }

    /// Warehouses a truck may load at or return to.
    pub fn open_warehouses(&self) -> impl Iterator<Item = WarehouseIdx> + '_ {
        WarehouseIdx::all(self.warehouses.len()).filter(|&idx| self.warehouse(idx).is_open())
    }

    pub fn principal_warehouse(&self) -> Option<WarehouseIdx> {
        self.open_warehouses()
            .find(|&idx| self.warehouse(idx).is_principal())
    }

    /// Closest open warehouse by Manhattan distance, principal first on ties.
    pub fn nearest_warehouse(&self, point: Point) -> Option<WarehouseIdx> {
        self.open_warehouses().min_by_key(|&idx| {
            let warehouse = self.warehouse(idx);
            (
                warehouse.location().manhattan_distance(&point),
                !warehouse.is_principal(),
            )
        })
    }

    pub fn warehouse_at(&self, point: Point) -> Option<WarehouseIdx> {
        self.open_warehouses()
            .find(|&idx| self.warehouse(idx).location() == point)
    }
}

#[cfg(test)]
mod tests {
    use crate::{
        problem::{truck::TruckStatus, truck_type::TruckType, warehouse::WarehouseStatus},
        test_utils,
    };

    use super::*;

    #[test]
    fn test_available_trucks_skip_unavailable() {
        let input = PlanningInput::new(
            test_utils::now(),
            vec![],
            vec![
                Truck::new("T1", TruckType::TA),
                Truck::new("T2", TruckType::TB).with_status(TruckStatus::Maintenance),
                Truck::new("T3", TruckType::TC).with_status(TruckStatus::Broken),
                Truck::new("T4", TruckType::TD),
            ],
            vec![],
        );

        let available: Vec<_> = input.available_trucks().map(|idx| idx.get()).collect();
        assert_eq!(available, vec![0, 3]);
    }

    #[test]
    fn test_nearest_warehouse_ignores_closed() {
        let input = PlanningInput::new(
            test_utils::now(),
            vec![],
            vec![],
            vec![
                Warehouse::new("central", Point::new(12, 8), 160.0).principal(),
                Warehouse::new("north", Point::new(42, 42), 160.0)
                    .with_status(WarehouseStatus::Closed),
                Warehouse::new("east", Point::new(63, 3), 160.0),
            ],
        );

        assert_eq!(
            input.nearest_warehouse(Point::new(40, 40)),
            Some(WarehouseIdx::new(0))
        );
        assert_eq!(
            input.nearest_warehouse(Point::new(60, 10)),
            Some(WarehouseIdx::new(2))
        );
        assert_eq!(input.principal_warehouse(), Some(WarehouseIdx::new(0)));
    }
}
