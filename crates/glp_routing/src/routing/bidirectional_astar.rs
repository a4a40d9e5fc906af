use std::collections::BinaryHeap;

use fxhash::FxHashMap;

use crate::{grid::obstacle_grid::ObstacleGrid, point::Point};

use super::{
    astar::{HeapItem, NodeData, walk_parents},
    astar_heuristic::AStarHeuristic,
    path_result::PathError,
    search_direction::SearchDirection,
    search_engines::{GridSearch, SearchLimits, SearchOutcome},
};

/// Bidirectional A* search.
///
/// Two frontiers grow from the origin and from the destination; the smaller
/// one is expanded next. The search stops as soon as a node settled by one
/// direction is popped by the other, and the two half paths are stitched at
/// that node.
#[derive(Default)]
pub struct BidirectionalAStar {
    // Forward search (from origin)
    forward_heap: BinaryHeap<HeapItem>,
    forward_data: FxHashMap<Point, NodeData>,

    // Backward search (from destination)
    backward_heap: BinaryHeap<HeapItem>,
    backward_data: FxHashMap<Point, NodeData>,
}

impl BidirectionalAStar {
    fn init<H: AStarHeuristic>(&mut self, origin: Point, destination: Point, heuristic: &H) {
        self.forward_heap.clear();
        self.forward_data.clear();
        self.backward_heap.clear();
        self.backward_data.clear();

        self.forward_heap.push(HeapItem {
            point: origin,
            g_score: 0,
            f_score: heuristic.estimate(&origin, &destination),
        });
        self.update_node_data(SearchDirection::Forward, origin, 0, None);

        self.backward_heap.push(HeapItem {
            point: destination,
            g_score: 0,
            f_score: heuristic.estimate(&destination, &origin),
        });
        self.update_node_data(SearchDirection::Backward, destination, 0, None);
    }

    fn node_data_for_direction(&mut self, dir: SearchDirection) -> &mut FxHashMap<Point, NodeData> {
        match dir {
            SearchDirection::Forward => &mut self.forward_data,
            SearchDirection::Backward => &mut self.backward_data,
        }
    }

    fn data(&self, dir: SearchDirection) -> &FxHashMap<Point, NodeData> {
        match dir {
            SearchDirection::Forward => &self.forward_data,
            SearchDirection::Backward => &self.backward_data,
        }
    }

    fn heap_for_direction(&mut self, dir: SearchDirection) -> &mut BinaryHeap<HeapItem> {
        match dir {
            SearchDirection::Forward => &mut self.forward_heap,
            SearchDirection::Backward => &mut self.backward_heap,
        }
    }

    fn update_node_data(
        &mut self,
        dir: SearchDirection,
        point: Point,
        g_score: u32,
        parent: Option<Point>,
    ) {
        let data = self
            .node_data_for_direction(dir)
            .entry(point)
            .or_insert_with(|| NodeData {
                settled: false,
                g_score: u32::MAX,
                parent: None,
            });
        data.settled = false;
        data.g_score = g_score;
        data.parent = parent;
    }

    #[inline(always)]
    fn is_settled(&self, dir: SearchDirection, point: &Point) -> bool {
        self.data(dir).get(point).is_some_and(|data| data.settled)
    }

    #[inline(always)]
    fn current_shortest_weight(&self, dir: SearchDirection, point: &Point) -> u32 {
        self.data(dir)
            .get(point)
            .map_or(u32::MAX, |data| data.g_score)
    }

    fn set_settled(&mut self, dir: SearchDirection, point: &Point) {
        if let Some(data) = self.node_data_for_direction(dir).get_mut(point) {
            data.settled = true;
        }
    }

    fn next_direction(&self) -> Option<SearchDirection> {
        match (self.forward_heap.is_empty(), self.backward_heap.is_empty()) {
            (true, true) => None,
            (false, true) => Some(SearchDirection::Forward),
            (true, false) => Some(SearchDirection::Backward),
            (false, false) => {
                if self.backward_heap.len() < self.forward_heap.len() {
                    Some(SearchDirection::Backward)
                } else {
                    Some(SearchDirection::Forward)
                }
            }
        }
    }

    fn build_path(&self, meeting: Point) -> Vec<Point> {
        // origin .. meeting
        let mut path = walk_parents(&self.forward_data, meeting);
        path.reverse();

        // meeting .. destination, the meeting node is already in place
        let backward = walk_parents(&self.backward_data, meeting);
        path.extend(backward.into_iter().skip(1));
        path
    }
}

impl GridSearch for BidirectionalAStar {
    fn calc_path<H: AStarHeuristic>(
        &mut self,
        grid: &ObstacleGrid,
        origin: Point,
        destination: Point,
        heuristic: &H,
        limits: &SearchLimits,
    ) -> SearchOutcome {
        self.init(origin, destination, heuristic);

        let mut nodes_explored = 0;

        while let Some(dir) = self.next_direction() {
            let Some(HeapItem { point, g_score, .. }) = self.heap_for_direction(dir).pop() else {
                continue;
            };

            if self.is_settled(dir, &point) {
                continue;
            }

            if g_score > self.current_shortest_weight(dir, &point) {
                continue;
            }

            self.set_settled(dir, &point);
            nodes_explored += 1;

            // Check if this node has been settled from the other direction
            if self.is_settled(dir.opposite(), &point) {
                return SearchOutcome {
                    path: Ok(self.build_path(point)),
                    nodes_explored,
                };
            }

            if let Some(error) = limits.exceeded(nodes_explored) {
                return SearchOutcome {
                    path: Err(error),
                    nodes_explored,
                };
            }

            let target = match dir {
                SearchDirection::Forward => destination,
                SearchDirection::Backward => origin,
            };

            for neighbor in grid.neighbors(&point) {
                if self.is_settled(dir, &neighbor) {
                    continue;
                }

                let next_weight = g_score + 1;
                if next_weight < self.current_shortest_weight(dir, &neighbor) {
                    self.update_node_data(dir, neighbor, next_weight, Some(point));
                    let h_score = heuristic.estimate(&neighbor, &target);
                    self.heap_for_direction(dir).push(HeapItem {
                        point: neighbor,
                        g_score: next_weight,
                        f_score: next_weight as f64 + h_score,
                    });
                }
            }
        }

        SearchOutcome {
            path: Err(PathError::NoPathExists),
            nodes_explored,
        }
    }
}
