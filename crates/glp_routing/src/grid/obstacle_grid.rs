use fxhash::FxHashMap;
use jiff::Timestamp;
use parking_lot::RwLock;
use smallvec::SmallVec;
use tracing::debug;

use crate::point::Point;

use super::{
    grid_bounds::GridBounds,
    obstacle::{Obstacle, ObstacleId},
};

struct RegisteredObstacle {
    obstacle: Obstacle,
    cells: Vec<Point>,
    active: bool,
}

struct GridState {
    obstacles: FxHashMap<ObstacleId, RegisteredObstacle>,
    /// Number of active obstacles covering each cell
    blocked: FxHashMap<Point, u32>,
    now: Option<Timestamp>,
    next_id: u64,
    generation: u64,
}

impl GridState {
    fn block(&mut self, cells: &[Point]) {
        for cell in cells {
            *self.blocked.entry(*cell).or_insert(0) += 1;
        }
    }

    fn unblock(&mut self, cells: &[Point]) {
        for cell in cells {
            if let Some(count) = self.blocked.get_mut(cell) {
                *count -= 1;
                if *count == 0 {
                    self.blocked.remove(cell);
                }
            }
        }
    }
}

struct ValidityMemo {
    generation: u64,
    values: FxHashMap<Point, bool>,
}

/// Spatial index of blocked cells.
///
/// Every mutation bumps a generation counter and drops the validity memo. A
/// reader that computed a value against an older generation never writes it
/// back into the memo.
pub struct ObstacleGrid {
    bounds: GridBounds,
    state: RwLock<GridState>,
    memo: RwLock<ValidityMemo>,
}

impl ObstacleGrid {
    pub fn new(bounds: GridBounds) -> Self {
        ObstacleGrid {
            bounds,
            state: RwLock::new(GridState {
                obstacles: FxHashMap::default(),
                blocked: FxHashMap::default(),
                now: None,
                next_id: 0,
                generation: 0,
            }),
            memo: RwLock::new(ValidityMemo {
                generation: 0,
                values: FxHashMap::default(),
            }),
        }
    }

    pub fn with_obstacles(
        bounds: GridBounds,
        now: Option<Timestamp>,
        obstacles: impl IntoIterator<Item = Obstacle>,
    ) -> Self {
        let grid = ObstacleGrid::new(bounds);
        if let Some(now) = now {
            grid.set_now(now);
        }
        for obstacle in obstacles {
            grid.add_obstacle(obstacle);
        }
        grid
    }

    pub fn bounds(&self) -> &GridBounds {
        &self.bounds
    }

    pub fn now(&self) -> Option<Timestamp> {
        self.state.read().now
    }

    pub fn generation(&self) -> u64 {
        self.state.read().generation
    }

    pub fn obstacle_count(&self) -> usize {
        self.state.read().obstacles.len()
    }

    pub fn blocked_cell_count(&self) -> usize {
        self.state.read().blocked.len()
    }

    pub fn obstacle(&self, id: ObstacleId) -> Option<Obstacle> {
        self.state
            .read()
            .obstacles
            .get(&id)
            .map(|registered| registered.obstacle.clone())
    }

    pub fn is_valid(&self, point: &Point) -> bool {
        if !self.bounds.contains(point) {
            return false;
        }

        {
            let memo = self.memo.read();
            if let Some(valid) = memo.values.get(point) {
                return *valid;
            }
        }

        let (valid, generation) = {
            let state = self.state.read();
            (!state.blocked.contains_key(point), state.generation)
        };

        let mut memo = self.memo.write();
        if memo.generation == generation {
            memo.values.insert(*point, valid);
        }

        valid
    }

    pub fn is_blocked(&self, point: &Point) -> bool {
        self.bounds.contains(point) && !self.is_valid(point)
    }

    pub fn neighbors(&self, point: &Point) -> SmallVec<[Point; 4]> {
        point
            .adjacent()
            .into_iter()
            .filter(|neighbor| self.is_valid(neighbor))
            .collect()
    }

    /// Returns true when one of the two axis-aligned L-shaped walks between
    /// `from` and `to` is free of obstacles. Not a substitute for a path search.
    pub fn direct_path_clear(&self, from: &Point, to: &Point) -> bool {
        if !self.is_valid(from) || !self.is_valid(to) {
            return false;
        }

        let horizontal_first = Point::new(to.x, from.y);
        let vertical_first = Point::new(from.x, to.y);

        (self.axis_walk_clear(from, &horizontal_first) && self.axis_walk_clear(&horizontal_first, to))
            || (self.axis_walk_clear(from, &vertical_first)
                && self.axis_walk_clear(&vertical_first, to))
    }

    fn axis_walk_clear(&self, from: &Point, to: &Point) -> bool {
        let step_x = (to.x - from.x).signum();
        let step_y = (to.y - from.y).signum();
        let mut current = *from;

        loop {
            if !self.is_valid(&current) {
                return false;
            }
            if current == *to {
                return true;
            }
            current.x += step_x;
            current.y += step_y;
        }
    }

    /// Registers the obstacle. It blocks its cells right away when active.
    pub fn add_obstacle(&self, obstacle: Obstacle) -> ObstacleId {
        let mut state = self.state.write();
        let id = ObstacleId::new(state.next_id);
        state.next_id += 1;

        let cells = obstacle.cells();
        let active = obstacle.is_active(state.now);
        if active {
            state.block(&cells);
        }

        debug!(obstacle = %id, cells = cells.len(), active, "Obstacle added");

        state.obstacles.insert(
            id,
            RegisteredObstacle {
                obstacle,
                cells,
                active,
            },
        );
        self.bump_generation(&mut state);

        id
    }

    pub fn remove_obstacle(&self, id: ObstacleId) -> Option<Obstacle> {
        let mut state = self.state.write();
        let registered = state.obstacles.remove(&id)?;
        if registered.active {
            state.unblock(&registered.cells);
        }

        debug!(obstacle = %id, "Obstacle removed");
        self.bump_generation(&mut state);

        Some(registered.obstacle)
    }

    pub fn obstacle_cells(&self, id: ObstacleId) -> Option<Vec<Point>> {
        self.state
            .read()
            .obstacles
            .get(&id)
            .map(|registered| registered.cells.clone())
    }

    /// Moves the grid clock. Returns the ids of temporal blocks whose activity
    /// changed.
    pub fn set_now(&self, now: Timestamp) -> Vec<ObstacleId> {
        let mut state = self.state.write();
        state.now = Some(now);

        let toggled: Vec<(ObstacleId, bool)> = state
            .obstacles
            .iter()
            .filter(|(_, registered)| registered.obstacle.is_temporal())
            .filter_map(|(id, registered)| {
                let active = registered.obstacle.is_active(Some(now));
                (active != registered.active).then_some((*id, active))
            })
            .collect();

        for (id, active) in &toggled {
            let cells = match state.obstacles.get_mut(id) {
                Some(registered) => {
                    registered.active = *active;
                    registered.cells.clone()
                }
                None => continue,
            };
            if *active {
                state.block(&cells);
            } else {
                state.unblock(&cells);
            }
        }

        if !toggled.is_empty() {
            debug!(toggled = toggled.len(), "Temporal blocks changed activity");
            self.bump_generation(&mut state);
        }

        toggled.into_iter().map(|(id, _)| id).collect()
    }

    fn bump_generation(&self, state: &mut GridState) {
        state.generation = state.generation.wrapping_add(1);
        let mut memo = self.memo.write();
        memo.generation = state.generation;
        memo.values.clear();
    }
}
