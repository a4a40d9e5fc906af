use std::sync::atomic::{AtomicBool, Ordering};

use rand::Rng;
use tracing::debug;

use crate::error::SequencingError;

use super::{ant_colony_params::AntColonyParams, distance_matrix::DistanceMatrix};

/// Distances below this are treated as this value when computing visibility.
const MIN_DISTANCE: f64 = 0.1;

#[derive(Debug, Clone, PartialEq)]
pub struct Tour {
    /// Node indices, always starting at the start node 0
    pub nodes: Vec<usize>,
    pub length: f64,
}

/// Ant colony search for the shortest open path from node 0 through every
/// other node of the matrix.
pub struct AntColony<'a> {
    params: &'a AntColonyParams,
    matrix: &'a DistanceMatrix,
    cancel: Option<&'a AtomicBool>,
}

impl<'a> AntColony<'a> {
    pub fn new(params: &'a AntColonyParams, matrix: &'a DistanceMatrix) -> Self {
        AntColony {
            params,
            matrix,
            cancel: None,
        }
    }

    /// Stops at the next iteration once `cancel` is set, keeping the best
    /// tour found so far.
    pub fn with_cancel(mut self, cancel: &'a AtomicBool) -> Self {
        self.cancel = Some(cancel);
        self
    }

    fn is_cancelled(&self) -> bool {
        self.cancel
            .is_some_and(|cancel| cancel.load(Ordering::Relaxed))
    }

    fn validate(&self) -> Result<(), SequencingError> {
        let params = self.params;
        if params.ants == 0 {
            return Err(SequencingError::InvalidParameter("ants"));
        }
        if params.iterations == 0 {
            return Err(SequencingError::InvalidParameter("iterations"));
        }
        if !params.alpha.is_finite() {
            return Err(SequencingError::InvalidParameter("alpha"));
        }
        if !params.beta.is_finite() {
            return Err(SequencingError::InvalidParameter("beta"));
        }
        if !(0.0..=1.0).contains(&params.rho) {
            return Err(SequencingError::InvalidParameter("rho"));
        }
        if !(0.0..=1.0).contains(&params.q0) {
            return Err(SequencingError::InvalidParameter("q0"));
        }
        if !(params.initial_pheromone.is_finite() && params.initial_pheromone > 0.0) {
            return Err(SequencingError::InvalidParameter("initial_pheromone"));
        }

        let size = self.matrix.size();
        if size == 0 {
            return Err(SequencingError::EmptyMatrix);
        }
        for from in 0..size {
            for to in 0..size {
                let distance = self.matrix.get(from, to);
                if !(distance.is_finite() && distance >= 0.0) {
                    return Err(SequencingError::InvalidDistance { from, to });
                }
            }
        }

        Ok(())
    }

    pub fn run<R: Rng>(&self, rng: &mut R) -> Result<Tour, SequencingError> {
        self.validate()?;

        let size = self.matrix.size();
        let mut pheromone = vec![self.params.initial_pheromone; size * size];
        let mut best: Option<Tour> = None;
        let mut stagnation = 0;

        for iteration in 0..self.params.iterations {
            if self.is_cancelled() {
                debug!(iteration, "Ant colony cancelled");
                break;
            }

            let tours: Vec<Tour> = (0..self.params.ants)
                .map(|_| self.construct_tour(&pheromone, rng))
                .collect();

            let mut improved = false;
            for tour in &tours {
                if best.as_ref().is_none_or(|best| tour.length < best.length) {
                    best = Some(tour.clone());
                    improved = true;
                }
            }

            let keep = 1.0 - self.params.rho;
            for value in pheromone.iter_mut() {
                *value *= keep;
            }

            for tour in &tours {
                if tour.length <= 0.0 {
                    continue;
                }
                let deposit = 1.0 / tour.length;
                for pair in tour.nodes.windows(2) {
                    pheromone[pair[0] * size + pair[1]] += deposit;
                    pheromone[pair[1] * size + pair[0]] += deposit;
                }
            }

            if improved {
                stagnation = 0;
            } else {
                stagnation += 1;
                if stagnation >= self.params.max_stagnation {
                    debug!(iteration, "Ant colony stagnated");
                    break;
                }
            }
        }

        best.ok_or(SequencingError::NoTourConstructed)
    }

    #[inline(always)]
    fn attraction(&self, pheromone: &[f64], from: usize, to: usize) -> f64 {
        let visibility = 1.0 / self.matrix.get(from, to).max(MIN_DISTANCE);
        pheromone[from * self.matrix.size() + to].powf(self.params.alpha)
            * visibility.powf(self.params.beta)
    }

    fn construct_tour<R: Rng>(&self, pheromone: &[f64], rng: &mut R) -> Tour {
        let size = self.matrix.size();
        let mut visited = vec![false; size];
        let mut nodes = Vec::with_capacity(size);
        let mut candidates: Vec<(usize, f64)> = Vec::with_capacity(size);

        nodes.push(0);
        visited[0] = true;
        let mut current = 0;
        let mut length = 0.0;

        while nodes.len() < size {
            candidates.clear();
            candidates.extend(
                (0..size)
                    .filter(|&node| !visited[node])
                    .map(|node| (node, self.attraction(pheromone, current, node))),
            );

            let next = if rng.random::<f64>() < self.params.q0 {
                exploit(&candidates)
            } else {
                roulette(&candidates, rng)
            };

            length += self.matrix.get(current, next);
            visited[next] = true;
            nodes.push(next);
            current = next;
        }

        Tour { nodes, length }
    }
}

/// Most attractive candidate, the lowest node index on ties.
fn exploit(candidates: &[(usize, f64)]) -> usize {
    candidates
        .iter()
        .fold(None, |best: Option<(usize, f64)>, &(node, attraction)| match best {
            Some((_, best_attraction)) if best_attraction >= attraction => best,
            _ => Some((node, attraction)),
        })
        .map_or(candidates[0].0, |(node, _)| node)
}

fn roulette<R: Rng>(candidates: &[(usize, f64)], rng: &mut R) -> usize {
    let total: f64 = candidates.iter().map(|(_, attraction)| attraction).sum();
    if !(total.is_finite() && total > 0.0) {
        return candidates[rng.random_range(0..candidates.len())].0;
    }

    let target = rng.random::<f64>() * total;
    let mut cumulative = 0.0;
    for &(node, attraction) in candidates {
        cumulative += attraction;
        if cumulative >= target {
            return node;
        }
    }

    // Rounding left the target just above the sum
    candidates[candidates.len() - 1].0
}

#[cfg(test)]
mod tests {
    use glp_routing::point::Point;
    use rand::{SeedableRng, rngs::SmallRng};

    use super::*;

    fn manhattan_matrix(points: &[Point]) -> DistanceMatrix {
        DistanceMatrix::from_fn(points.len(), |a, b| {
            f64::from(points[a].manhattan_distance(&points[b]))
        })
    }

    #[test]
    fn test_finds_line_order() {
        let points = [
            Point::new(0, 0),
            Point::new(40, 0),
            Point::new(10, 0),
            Point::new(30, 0),
            Point::new(20, 0),
        ];
        let matrix = manhattan_matrix(&points);
        let params = AntColonyParams::default();
        let mut rng = SmallRng::seed_from_u64(7);

        let tour = AntColony::new(&params, &matrix).run(&mut rng).unwrap();

        assert_eq!(tour.nodes, vec![0, 2, 4, 3, 1]);
        assert_eq!(tour.length, 40.0);
    }

    #[test]
    fn test_tour_visits_every_node_once() {
        let points: Vec<Point> = (0..9).map(|i| Point::new((i * 7) % 11, (i * 5) % 13)).collect();
        let matrix = manhattan_matrix(&points);
        let params = AntColonyParams {
            iterations: 20,
            ..AntColonyParams::default()
        };
        let mut rng = SmallRng::seed_from_u64(1);

        let tour = AntColony::new(&params, &matrix).run(&mut rng).unwrap();

        let mut sorted = tour.nodes.clone();
        sorted.sort_unstable();
        assert_eq!(sorted, (0..9).collect::<Vec<_>>());
        assert_eq!(tour.nodes[0], 0);
        assert_eq!(tour.length, matrix.path_length(&tour.nodes));
    }

    #[test]
    fn test_single_node() {
        let matrix = DistanceMatrix::from_fn(1, |_, _| 0.0);
        let params = AntColonyParams::default();
        let tour = AntColony::new(&params, &matrix)
            .run(&mut SmallRng::seed_from_u64(0))
            .unwrap();
        assert_eq!(tour.nodes, vec![0]);
        assert_eq!(tour.length, 0.0);
    }

    #[test]
    fn test_rejects_invalid_input() {
        let matrix = DistanceMatrix::from_fn(3, |_, _| 1.0);
        let params = AntColonyParams {
            rho: 1.5,
            ..AntColonyParams::default()
        };
        assert_eq!(
            AntColony::new(&params, &matrix).run(&mut SmallRng::seed_from_u64(0)),
            Err(SequencingError::InvalidParameter("rho"))
        );

        let matrix = DistanceMatrix::from_fn(3, |a, b| if a + b == 3 { f64::NAN } else { 1.0 });
        let params = AntColonyParams::default();
        assert_eq!(
            AntColony::new(&params, &matrix).run(&mut SmallRng::seed_from_u64(0)),
            Err(SequencingError::InvalidDistance { from: 1, to: 2 })
        );
    }

    #[test]
    fn test_cancelled_colony_stops() {
        let matrix = DistanceMatrix::from_fn(4, |a, b| a.abs_diff(b) as f64);
        let params = AntColonyParams {
            iterations: usize::MAX,
            max_stagnation: usize::MAX,
            ..AntColonyParams::default()
        };
        let cancel = AtomicBool::new(true);

        let result = AntColony::new(&params, &matrix)
            .with_cancel(&cancel)
            .run(&mut SmallRng::seed_from_u64(0));

        assert_eq!(result, Err(SequencingError::NoTourConstructed));
    }

    #[test]
    fn test_identical_locations_do_not_break_visibility() {
        let points = [Point::new(0, 0), Point::new(5, 5), Point::new(5, 5), Point::new(9, 9)];
        let matrix = manhattan_matrix(&points);
        let params = AntColonyParams::default();

        let tour = AntColony::new(&params, &matrix)
            .run(&mut SmallRng::seed_from_u64(3))
            .unwrap();

        assert_eq!(tour.length, 18.0);
    }
}
