use crate::point::Point;

/// Cells crossed by the segment `from -> to`, both ends included.
///
/// Integer Bresenham walk. The produced line is 8-connected, which is enough to
/// block 4-directional movement across it.
pub fn segment_cells(from: Point, to: Point) -> Vec<Point> {
    let dx = (to.x - from.x).abs();
    let dy = -(to.y - from.y).abs();
    let sx = if from.x < to.x { 1 } else { -1 };
    let sy = if from.y < to.y { 1 } else { -1 };

    let mut cells = Vec::with_capacity((dx.max(-dy) + 1) as usize);
    let mut error = dx + dy;
    let mut current = from;

    loop {
        cells.push(current);
        if current == to {
            break;
        }

        let doubled = 2 * error;
        if doubled >= dy {
            error += dy;
            current.x += sx;
        }
        if doubled <= dx {
            error += dx;
            current.y += sy;
        }
    }

    cells
}

/// Cells of the chain `vertices[0] -> vertices[1] -> ... -> vertices[n - 1]`.
/// The chain is closed only if the last vertex repeats the first one.
pub fn chain_cells(vertices: &[Point]) -> Vec<Point> {
    match vertices {
        [] => Vec::new(),
        [single] => vec![*single],
        _ => {
            let mut cells = Vec::new();
            for window in vertices.windows(2) {
                let segment = segment_cells(window[0], window[1]);
                // Skip the shared vertex with the previous segment
                let skip = usize::from(!cells.is_empty());
                cells.extend(segment.into_iter().skip(skip));
            }
            cells
        }
    }
}
