use crate::point::Point;

pub trait AStarHeuristic {
    fn estimate(&self, from: &Point, to: &Point) -> f64;
}

/// `manhattan(from, to) * weight`. A weight above 1 overestimates and trades
/// optimality for fewer expanded nodes.
#[derive(Clone, Copy, Debug)]
pub struct WeightedManhattan {
    weight: f64,
}

impl WeightedManhattan {
    pub fn new(weight: f64) -> Self {
        WeightedManhattan { weight }
    }
}

impl Default for WeightedManhattan {
    fn default() -> Self {
        WeightedManhattan::new(1.0)
    }
}

impl AStarHeuristic for WeightedManhattan {
    #[inline(always)]
    fn estimate(&self, from: &Point, to: &Point) -> f64 {
        from.manhattan_distance(to) as f64 * self.weight
    }
}
