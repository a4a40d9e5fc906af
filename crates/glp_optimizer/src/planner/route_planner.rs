use std::{
    panic::{self, AssertUnwindSafe},
    sync::{
        Arc,
        atomic::{AtomicBool, Ordering},
        mpsc,
    },
    thread,
    time::{Duration, Instant},
};

use glp_routing::{
    cache::{
        cache_statistics::CacheStatistics,
        path_cache::PathCache,
        refresher::{CacheRefresher, PathRecompute},
    },
    clock::Clock,
    grid::{obstacle::Obstacle, obstacle_grid::ObstacleGrid},
    routing::{pathfinder::Pathfinder, pathfinder_statistics::PathfinderStatistics},
    timer_debug,
    utils::timeout_collector::collect_with_timeout,
};
use parking_lot::Mutex;
use tracing::{debug, info, warn};

use crate::{
    distance::PathOracle,
    error::{PlannerBuildError, RoutingError},
    packing::order_packer::OrderPacker,
    problem::{
        order::Order, planning_input::PlanningInput, truck::Truck,
        truck_assignment::TruckAssignment, warehouse::Warehouse,
    },
};

use super::{
    obstacle_change::{InvalidationArea, ObstacleChange, ObstacleChangeOutcome},
    planner_params::PlannerParams,
    planning_outcome::{
        PlannedRoute, PlanningOutcome, PlanningStatistics, RejectedRoute, RejectionReason,
    },
    truck_planner::TruckPlanner,
};

type TruckResult = Result<PlannedRoute, RejectedRoute>;

/// Runs the whole pipeline: packing, then one route per loaded truck.
///
/// Owns the shared path cache, its refresh workers, the pathfinder pool and a
/// separate pool for per-truck planning.
pub struct RoutePlanner {
    params: PlannerParams,
    grid: Arc<ObstacleGrid>,
    clock: Arc<dyn Clock>,
    cache: Arc<PathCache>,
    pathfinder: Arc<Pathfinder>,
    refresher: Mutex<Option<CacheRefresher>>,
    packer: OrderPacker,
    trucks: Arc<TruckPlanner>,
    pool: rayon::ThreadPool,
}

impl RoutePlanner {
    pub fn new(
        params: PlannerParams,
        grid: Arc<ObstacleGrid>,
        clock: Arc<dyn Clock>,
    ) -> Result<Self, PlannerBuildError> {
        if let Some(parameter) = params.fuel.invalid_parameter() {
            return Err(PlannerBuildError::InvalidParameter(parameter));
        }

        let cache = Arc::new(PathCache::new(
            params.cache.clone(),
            Arc::new(CacheStatistics::default()),
        ));
        let pathfinder = Arc::new(Pathfinder::new(
            params.pathfinder.clone(),
            Some(Arc::clone(&grid)),
            Some(Arc::clone(&cache)),
            Arc::new(PathfinderStatistics::default()),
        )?);

        let refresher = if params.cache.refresh_on_invalidate && params.cache.refresh_threads > 0 {
            let recompute: Arc<dyn PathRecompute> = pathfinder.clone();
            Some(CacheRefresher::start(
                Arc::clone(&cache),
                recompute,
                params.cache.refresh_threads,
            )?)
        } else {
            None
        };

        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(params.threads.number_of_threads())
            .thread_name(|index| format!("planner-{index}"))
            .build()?;

        let oracle = PathOracle::new(Arc::clone(&pathfinder), params.pathfinder.search.clone());
        let planner = RoutePlanner {
            packer: OrderPacker::new(params.packing.clone()),
            trucks: Arc::new(TruckPlanner::new(&params, oracle)),
            params,
            grid,
            clock,
            cache,
            pathfinder,
            refresher: Mutex::new(refresher),
            pool,
        };

        if planner.params.prewarm {
            planner
                .pool
                .broadcast(|_| planner.pathfinder.warm_up_thread());
            debug!(
                threads = planner.pool.current_num_threads(),
                "Planner pool pre-warmed"
            );
        }

        Ok(planner)
    }

    pub fn params(&self) -> &PlannerParams {
        &self.params
    }

    pub fn grid(&self) -> &Arc<ObstacleGrid> {
        &self.grid
    }

    pub fn cache(&self) -> &Arc<PathCache> {
        &self.cache
    }

    pub fn pathfinder(&self) -> &Arc<Pathfinder> {
        &self.pathfinder
    }

    pub fn oracle(&self) -> &PathOracle {
        self.trucks.oracle()
    }

    /// Freezes the current fleet state at the planner's clock.
    pub fn snapshot_input(
        &self,
        orders: Vec<Order>,
        trucks: Vec<Truck>,
        warehouses: Vec<Warehouse>,
    ) -> PlanningInput {
        PlanningInput::new(self.clock.now(), orders, trucks, warehouses)
    }

    pub fn plan(&self, input: PlanningInput) -> PlanningOutcome {
        let start = Instant::now();
        let input = Arc::new(input);

        self.sync_grid_time(&input);

        let packing = timer_debug!("Packing", self.packer.pack(&input));
        let assignments: Vec<TruckAssignment> = packing
            .assignments
            .iter()
            .filter(|assignment| !assignment.is_empty())
            .cloned()
            .collect();

        let (results, timed_out) = timer_debug!(
            "Planning trucks",
            if self.params.parallel_trucks && assignments.len() > 1 {
                self.plan_parallel(&input, &assignments)
            } else {
                let results = assignments
                    .iter()
                    .map(|assignment| self.trucks.plan(&input, assignment))
                    .collect();
                (results, false)
            }
        );

        let mut routes = Vec::new();
        let mut rejected = Vec::new();
        for result in results {
            match result {
                Ok(route) => routes.push(route),
                Err(rejection) => {
                    warn!(
                        truck = input.truck(rejection.truck).id(),
                        reason = ?rejection.reason,
                        "Route rejected"
                    );
                    rejected.push(rejection);
                }
            }
        }

        let statistics = PlanningStatistics {
            strategy: packing.strategy,
            trucks_planned: assignments.len(),
            routes: routes.len(),
            rejected: rejected.len(),
            timed_out,
            elapsed: start.elapsed(),
            pathfinder: self.pathfinder.statistics().snapshot(),
            cache: self.cache.statistics().snapshot(),
        };

        info!(
            routes = statistics.routes,
            rejected = statistics.rejected,
            unassigned = packing.unassigned.len(),
            elapsed = ?statistics.elapsed,
            "Planning run finished"
        );

        PlanningOutcome {
            input,
            routes,
            rejected,
            unassigned: packing.unassigned,
            statistics,
        }
    }

    /// One task per truck on the planner pool. Trucks not done within
    /// `truck_timeout` are reported as timed out and their tasks are cancelled,
    /// a panicking truck is reported as failed.
    fn plan_parallel(
        &self,
        input: &Arc<PlanningInput>,
        assignments: &[TruckAssignment],
    ) -> (Vec<TruckResult>, bool) {
        let (sender, receiver) = mpsc::channel();
        let cancel = Arc::new(AtomicBool::new(false));

        for (index, assignment) in assignments.iter().enumerate() {
            let trucks = Arc::clone(&self.trucks);
            let input = Arc::clone(input);
            let assignment = assignment.clone();
            let sender = sender.clone();
            let cancel = Arc::clone(&cancel);

            self.pool.spawn(move || {
                // Still queued when the run gave up
                if cancel.load(Ordering::Relaxed) {
                    return;
                }
                let result = panic::catch_unwind(AssertUnwindSafe(|| {
                    trucks.plan_cancellable(&input, &assignment, Some(cancel.as_ref()))
                }));
                let _ = sender.send((index, result));
            });
        }
        drop(sender);

        let outcome = collect_with_timeout(
            &receiver,
            assignments.len(),
            self.params.truck_timeout.unsigned_abs(),
            Duration::ZERO,
        );
        if outcome.timed_out {
            cancel.store(true, Ordering::Relaxed);
            warn!(missing = outcome.missing(), "Truck planning timed out, cancelling");
        }

        (
            truck_results(input, assignments, outcome.results),
            outcome.timed_out,
        )
    }

    /// Moves the grid clock to the run's time and drops cached paths around
    /// temporal blocks that switched on or off.
    fn sync_grid_time(&self, input: &PlanningInput) {
        let toggled = self.grid.set_now(input.now());
        let mut invalidated = 0;
        for id in &toggled {
            if let Some(obstacle) = self.grid.obstacle(*id) {
                invalidated += self.invalidate(&obstacle, true);
            }
        }
        if !toggled.is_empty() {
            debug!(
                toggled = toggled.len(),
                invalidated, "Temporal obstacles changed state"
            );
        }
    }

    pub fn apply_obstacle_change(&self, change: ObstacleChange) -> ObstacleChangeOutcome {
        let outcome = match change {
            ObstacleChange::Added { obstacle } => {
                let id = self.grid.add_obstacle(obstacle.clone());
                ObstacleChangeOutcome {
                    obstacle: Some(id),
                    invalidated_paths: self.invalidate(&obstacle, false),
                }
            }
            ObstacleChange::Removed { id } => match self.grid.remove_obstacle(id) {
                Some(obstacle) => ObstacleChangeOutcome {
                    obstacle: Some(id),
                    invalidated_paths: self.invalidate(&obstacle, true),
                },
                None => ObstacleChangeOutcome {
                    obstacle: None,
                    invalidated_paths: 0,
                },
            },
        };

        debug!(
            obstacle = ?outcome.obstacle,
            invalidated = outcome.invalidated_paths,
            "Obstacle change applied"
        );
        outcome
    }

    /// Added obstacles only break paths through their cells. Cleared ones
    /// also make detours around them stale, `cleared` widens the area for that.
    fn invalidate(&self, obstacle: &Obstacle, cleared: bool) -> usize {
        let area = InvalidationArea::of(obstacle).map(|area| if cleared { area.widened() } else { area });
        match area {
            Some(InvalidationArea::Cell(point)) => self.cache.invalidate_point(point),
            Some(InvalidationArea::Region { center, radius }) => {
                self.cache.invalidate_region(center, radius)
            }
            None => 0,
        }
    }

    /// Stops the cache refresh workers. Returns false when some worker did not
    /// stop within `timeout`, those are detached.
    pub fn shutdown(&self, timeout: Duration) -> bool {
        match self.refresher.lock().take() {
            Some(refresher) => refresher.shutdown(timeout),
            None => true,
        }
    }
}

impl Drop for RoutePlanner {
    fn drop(&mut self) {
        self.cache.refresh_queue().close();
    }
}

/// Turns collected task results into one result per assignment. A missing
/// result timed out, a panic payload means the truck's planning crashed.
fn truck_results(
    input: &PlanningInput,
    assignments: &[TruckAssignment],
    results: Vec<Option<thread::Result<TruckResult>>>,
) -> Vec<TruckResult> {
    results
        .into_iter()
        .zip(assignments)
        .map(|(result, assignment)| {
            let truck = input.truck(assignment.truck()).id().to_owned();
            let error = match result {
                Some(Ok(result)) => return result,
                Some(Err(_)) => RoutingError::PlanningFailed { truck },
                None => RoutingError::PlanningTimeout { truck },
            };
            Err(RejectedRoute {
                truck: assignment.truck(),
                deliveries: assignment.deliveries().to_vec(),
                reason: RejectionReason::Routing { error },
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use glp_routing::{
        clock::SimulatedClock, grid::grid_bounds::GridBounds, point::Point,
        utils::threads::Threads,
    };
    use jiff::{SignedDuration, Timestamp};

    use crate::{
        problem::{order::OrderIdx, truck::TruckIdx, truck_type::TruckType},
        test_utils,
    };

    use super::*;

    fn params() -> PlannerParams {
        let mut params = PlannerParams {
            threads: Threads::Multi(2),
            prewarm: false,
            ..PlannerParams::default()
        };
        params.pathfinder.threads = Threads::Multi(2);
        params.pathfinder.prewarm = false;
        params.ant_colony.seed = Some(3);
        params.cache.refresh_on_invalidate = false;
        params
    }

    fn planner(params: PlannerParams, grid: Arc<ObstacleGrid>) -> RoutePlanner {
        let clock = Arc::new(SimulatedClock::new(test_utils::now()));
        RoutePlanner::new(params, grid, clock).unwrap()
    }

    fn fleet_input(planner: &RoutePlanner) -> PlanningInput {
        planner.snapshot_input(
            vec![
                test_utils::order("A", 10, 10, 8.0, 6),
                test_utils::order("B", 20, 10, 6.0, 6),
                test_utils::order("C", 30, 20, 6.0, 20),
                test_utils::order("D", 40, 5, 4.0, 30),
            ],
            vec![
                Truck::new("TA01", TruckType::TA),
                Truck::new("TC01", TruckType::TC),
                Truck::new("TD01", TruckType::TD),
            ],
            vec![
                Warehouse::new("main", Point::new(12, 8), 160.0).principal(),
                Warehouse::new("east", Point::new(63, 3), 50.0),
            ],
        )
    }

    #[test]
    fn test_plans_every_order() {
        let mut params = params();
        params.cache.refresh_on_invalidate = true;
        let planner = planner(params, test_utils::open_grid());

        let outcome = planner.plan(fleet_input(&planner));

        assert!(outcome.rejected.is_empty(), "{:?}", outcome.rejected);
        assert!(outcome.unassigned.is_empty());
        let delivered: f64 = outcome
            .routes
            .iter()
            .flat_map(|planned| planned.route.segments())
            .filter_map(|segment| segment.delivery())
            .map(|(_, volume)| volume)
            .sum();
        assert!((delivered - 24.0).abs() < 1e-9);
        for planned in &outcome.routes {
            assert!(planned.route.is_chained());
            assert!(planned.route.segments().last().unwrap().is_return());
            assert!(planned.validation.is_feasible());
        }
        assert!(!outcome.statistics.timed_out);
        assert!(planner.shutdown(Duration::from_secs(1)));
    }

    #[test]
    fn test_sequential_matches_parallel() {
        let parallel = planner(params(), test_utils::open_grid());
        let sequential = planner(
            PlannerParams {
                parallel_trucks: false,
                ..params()
            },
            test_utils::open_grid(),
        );

        let a = parallel.plan(fleet_input(&parallel));
        let b = sequential.plan(fleet_input(&sequential));

        let distances = |outcome: &PlanningOutcome| {
            let mut distances: Vec<(TruckIdx, u64)> = outcome
                .routes
                .iter()
                .map(|planned| {
                    (
                        planned.route.truck(),
                        planned.route.total_distance_km().round() as u64,
                    )
                })
                .collect();
            distances.sort();
            distances
        };
        assert_eq!(distances(&a), distances(&b));
    }

    #[test]
    fn test_stranded_truck_is_reported() {
        let planner = planner(params(), test_utils::open_grid());
        let input = planner.snapshot_input(
            vec![test_utils::order("A", 60, 40, 2.0, 6)],
            vec![Truck::new("TD01", TruckType::TD)
                .with_position(Point::new(60, 40))
                .with_fuel(0.01)],
            vec![Warehouse::new("main", Point::new(0, 0), 160.0).principal()],
        );

        let outcome = planner.plan(input);

        assert!(outcome.routes.is_empty());
        assert_eq!(outcome.rejected.len(), 1);
        assert!(outcome.requires_intervention());
        assert!(matches!(
            outcome.rejected[0].reason,
            RejectionReason::Routing {
                error: RoutingError::NoWarehouseReachable { .. }
            }
        ));
    }

    #[test]
    fn test_timed_out_trucks_are_cancelled() {
        let mut params = params();
        params.truck_timeout = SignedDuration::from_secs(1);
        params.ant_colony.iterations = usize::MAX;
        params.ant_colony.max_stagnation = usize::MAX;
        let planner = planner(params, test_utils::open_grid());
        let fleet = || {
            vec![
                Truck::new("TD01", TruckType::TD),
                Truck::new("TD02", TruckType::TD),
            ]
        };
        let warehouses = || vec![Warehouse::new("main", Point::new(12, 8), 160.0).principal()];

        // Three stops per truck keep the colony running until cancelled
        let busy = planner.snapshot_input(
            (0..6)
                .map(|i: i32| test_utils::order(&format!("busy{i}"), 10 + i * 3, 10, 1.5, 24))
                .collect(),
            fleet(),
            warehouses(),
        );
        let outcome = planner.plan(busy);

        assert!(outcome.statistics.timed_out);
        assert!(outcome.routes.is_empty());
        assert_eq!(outcome.rejected.len(), 2);
        for rejection in &outcome.rejected {
            assert!(matches!(
                rejection.reason,
                RejectionReason::Routing {
                    error: RoutingError::PlanningTimeout { .. }
                }
            ));
        }

        // Two stops per truck skip the colony. Both pool threads must have been
        // released by the cancelled trucks for this run to finish in time.
        let light = planner.snapshot_input(
            (0..4)
                .map(|i: i32| test_utils::order(&format!("light{i}"), 14 + i * 2, 10, 2.0, 24))
                .collect(),
            fleet(),
            warehouses(),
        );
        let outcome = planner.plan(light);

        assert!(!outcome.statistics.timed_out);
        assert_eq!(outcome.routes.len(), 2, "{:?}", outcome.rejected);
    }

    #[test]
    fn test_truck_results_report_crashes_and_timeouts() {
        let input = test_utils::input(
            vec![
                test_utils::order("A", 10, 10, 1.0, 24),
                test_utils::order("B", 20, 10, 1.0, 24),
            ],
            vec![
                Truck::new("TD01", TruckType::TD),
                Truck::new("TD02", TruckType::TD),
            ],
            vec![],
        );
        let assignments: Vec<TruckAssignment> = (0..2)
            .map(|index| {
                let mut assignment = TruckAssignment::new(TruckIdx::new(index), 5.0);
                assert!(assignment.assign(OrderIdx::new(index), 1.0, 300));
                assignment
            })
            .collect();
        let crashed: thread::Result<TruckResult> = Err(Box::new("boom"));

        let results = truck_results(&input, &assignments, vec![Some(crashed), None]);

        assert_eq!(results.len(), 2);
        let reasons: Vec<&RoutingError> = results
            .iter()
            .map(|result| match result {
                Err(RejectedRoute {
                    reason: RejectionReason::Routing { error },
                    ..
                }) => error,
                other => panic!("unexpected result {other:?}"),
            })
            .collect();
        assert_eq!(
            reasons[0],
            &RoutingError::PlanningFailed {
                truck: "TD01".to_owned()
            }
        );
        assert_eq!(
            reasons[1],
            &RoutingError::PlanningTimeout {
                truck: "TD02".to_owned()
            }
        );
        for (result, assignment) in results.iter().zip(&assignments) {
            let Err(rejected) = result else {
                unreachable!()
            };
            assert_eq!(rejected.truck, assignment.truck());
            assert_eq!(rejected.deliveries.len(), 1);
        }
    }

    #[test]
    fn test_rejects_zero_consumption_divisor() {
        let mut params = params();
        params.fuel.consumption_divisor = 0.0;
        let clock = Arc::new(SimulatedClock::new(test_utils::now()));

        let result = RoutePlanner::new(params, test_utils::open_grid(), clock);

        assert!(matches!(
            result,
            Err(PlannerBuildError::InvalidParameter("consumption_divisor"))
        ));
    }

    #[test]
    fn test_obstacle_change_invalidates_cached_paths() {
        let grid = Arc::new(ObstacleGrid::new(GridBounds::with_size(30, 30)));
        let planner = planner(params(), grid);
        let origin = Point::new(0, 5);
        let destination = Point::new(20, 5);
        assert!(planner.oracle().path(origin, destination).success());
        assert!(planner.cache().contains(origin, destination));

        let outcome = planner.apply_obstacle_change(ObstacleChange::Added {
            obstacle: Obstacle::VerticalLine { x: 10, y1: 0, y2: 10 },
        });

        assert!(outcome.obstacle.is_some());
        assert!(outcome.invalidated_paths >= 1);
        assert!(!planner.cache().contains(origin, destination));
        let detour = planner.oracle().path(origin, destination);
        assert!(detour.grid_distance().unwrap() > 20);

        let Some(id) = outcome.obstacle else {
            unreachable!()
        };
        let removed = planner.apply_obstacle_change(ObstacleChange::Removed { id });
        assert_eq!(removed.obstacle, Some(id));
        assert_eq!(planner.oracle().path(origin, destination).grid_distance(), Some(20));
    }

    #[test]
    fn test_temporal_block_follows_planning_time() {
        let grid = Arc::new(ObstacleGrid::new(GridBounds::with_size(30, 30)));
        let start: Timestamp = test_utils::now();
        grid.add_obstacle(Obstacle::TemporalBlock {
            vertices: vec![Point::new(10, 0), Point::new(10, 29)],
            start: Some(start + SignedDuration::from_hours(2)),
            end: Some(start + SignedDuration::from_hours(4)),
        });
        let clock = Arc::new(SimulatedClock::new(start));
        let planner = RoutePlanner::new(params(), grid, clock.clone()).unwrap();
        let origin = Point::new(0, 5);
        let destination = Point::new(20, 5);

        planner.plan(planner.snapshot_input(vec![], vec![], vec![]));
        assert_eq!(planner.oracle().path(origin, destination).grid_distance(), Some(20));

        clock.advance(SignedDuration::from_hours(3));
        planner.plan(planner.snapshot_input(vec![], vec![], vec![]));
        let blocked = planner.oracle().path(origin, destination);
        assert!(blocked.grid_distance().unwrap() > 20);

        clock.advance(SignedDuration::from_hours(2));
        planner.plan(planner.snapshot_input(vec![], vec![], vec![]));
        assert_eq!(planner.oracle().path(origin, destination).grid_distance(), Some(20));
    }
}
