use crate::config::{EdgeConfig, RouteStyle};
use crate::error::DiagramError;
use crate::ir::{Diagram, Edge, NodeKey};

use super::geometry::{EPSILON, Point, Rect};
use super::{EdgeLayout, EdgeSide};

// ── Curve shaping ───────────────────────────────────────────────────
/// Below this half-distance, vertical curves hug the anchors instead of bowing.
const CURVE_FLAT_HALF_SPAN: f32 = 20.0;
/// Lower bound for spline sampling so short curves still look smooth.
const CURVE_MIN_SAMPLES: usize = 2;

/// Routes every edge of the diagram.
///
/// Edges that cannot be routed are left out of the result and reported in the
/// returned error list; the remaining edges are unaffected.
pub fn route_edges(diagram: &Diagram, config: &EdgeConfig) -> (Vec<EdgeLayout>, Vec<DiagramError>) {
    let mut routed = Vec::with_capacity(diagram.edges.len());
    let mut errors = Vec::new();
    for edge in &diagram.edges {
        match route_edge(diagram, edge, config) {
            Ok(layout) => routed.push(layout),
            Err(err) => errors.push(err),
        }
    }
    (routed, errors)
}

/// Resolves both endpoints of `edge` against the laid-out tree and builds its path.
pub fn route_edge(diagram: &Diagram, edge: &Edge, config: &EdgeConfig) -> Result<EdgeLayout, DiagramError> {
    let id = edge.id();
    if edge.source == edge.target {
        return Err(DiagramError::InvalidEdge {
            edge: id,
            reason: "source and target are the same node".to_string(),
        });
    }
    let source = resolve(diagram, &edge.source, &id)?;
    let target = resolve(diagram, &edge.target, &id)?;

    let lca = diagram.lowest_common_ancestor(source, target);
    let enclosed = lca.is_some_and(|lca| diagram[lca].collapsed || diagram.is_hidden(lca));
    let from = visible_anchor(diagram, source, lca);
    let to = visible_anchor(diagram, target, lca);

    let mut layout = EdgeLayout {
        id,
        source: edge.source.clone(),
        target: edge.target.clone(),
        source_anchor: diagram[from].id.clone(),
        target_anchor: diagram[to].id.clone(),
        kind: edge.kind.clone(),
        state: edge.state.clone(),
        internal: edge.internal,
        points: Vec::new(),
        start_side: None,
        end_side: None,
        ghost: None,
        hidden: true,
    };
    if enclosed || !config.show_edges {
        return Ok(layout);
    }

    let from_rect = diagram.global_rect(from);
    let to_rect = diagram.global_rect(to);
    let (start_side, end_side) = edge_sides(&from_rect, &to_rect, config.route_style);
    let start = side_point(&from_rect, start_side);
    let end = side_point(&to_rect, end_side);

    layout.points = if config.curved {
        curve_route(start, end, start_side, end_side, config)
    } else {
        orthogonal_route(start, end, start_side, end_side)
    };
    if config.show_ghostlines {
        layout.ghost = Some(vec![from_rect.center(), to_rect.center()]);
    }
    layout.start_side = Some(start_side);
    layout.end_side = Some(end_side);
    layout.hidden = false;
    Ok(layout)
}

fn resolve(diagram: &Diagram, id: &str, edge: &str) -> Result<NodeKey, DiagramError> {
    diagram.key(id).ok_or_else(|| DiagramError::UnresolvedEndpoint {
        edge: edge.to_string(),
        id: id.to_string(),
    })
}

/// The outermost collapsed ancestor of `key` strictly below `stop`, or `key`
/// itself when nothing in between is collapsed.
fn visible_anchor(diagram: &Diagram, key: NodeKey, stop: Option<NodeKey>) -> NodeKey {
    let mut anchor = key;
    for ancestor in diagram.ancestors(key) {
        if Some(ancestor) == stop {
            break;
        }
        if diagram[ancestor].collapsed {
            anchor = ancestor;
        }
    }
    anchor
}

// ── Edge side selection ─────────────────────────────────────────────

/// Side pair with the closest anchors among pairs where each anchor faces the
/// other one. Same-side pairs are never used; channel routing also skips
/// perpendicular pairs. Overlapping or nested boxes have no facing pair and
/// fall back to the dominant center offset.
pub(crate) fn edge_sides(from: &Rect, to: &Rect, style: RouteStyle) -> (EdgeSide, EdgeSide) {
    let mut best: Option<(f32, EdgeSide, EdgeSide)> = None;
    for start_side in EdgeSide::ALL {
        for end_side in EdgeSide::ALL {
            if start_side == end_side {
                continue;
            }
            let opposite = start_side.is_horizontal() == end_side.is_horizontal();
            if style == RouteStyle::Channel && !opposite {
                continue;
            }
            let start = side_point(from, start_side);
            let end = side_point(to, end_side);
            if !heads_towards(start_side, start, end) || !heads_towards(end_side, end, start) {
                continue;
            }
            let delta = end - start;
            let distance = delta.x.hypot(delta.y);
            if best.is_none_or(|(closest, _, _)| distance < closest) {
                best = Some((distance, start_side, end_side));
            }
        }
    }
    match best {
        Some((_, start_side, end_side)) => (start_side, end_side),
        None => dominant_sides(from, to),
    }
}

/// Whether a path leaving `anchor` through `side` moves towards `other`.
fn heads_towards(side: EdgeSide, anchor: Point, other: Point) -> bool {
    match side {
        EdgeSide::Left => other.x <= anchor.x + EPSILON,
        EdgeSide::Right => other.x >= anchor.x - EPSILON,
        EdgeSide::Top => other.y <= anchor.y + EPSILON,
        EdgeSide::Bottom => other.y >= anchor.y - EPSILON,
    }
}

/// Left/right sides when the centers are offset mostly horizontally,
/// top/bottom otherwise.
fn dominant_sides(from: &Rect, to: &Rect) -> (EdgeSide, EdgeSide) {
    let delta = to.center() - from.center();
    if delta.x.abs() >= delta.y.abs() {
        if delta.x >= 0.0 {
            (EdgeSide::Right, EdgeSide::Left)
        } else {
            (EdgeSide::Left, EdgeSide::Right)
        }
    } else if delta.y >= 0.0 {
        (EdgeSide::Bottom, EdgeSide::Top)
    } else {
        (EdgeSide::Top, EdgeSide::Bottom)
    }
}

/// Midpoint of one side of `rect`.
pub(crate) fn side_point(rect: &Rect, side: EdgeSide) -> Point {
    match side {
        EdgeSide::Left => Point::new(rect.x, rect.y + rect.height / 2.0),
        EdgeSide::Right => Point::new(rect.right(), rect.y + rect.height / 2.0),
        EdgeSide::Top => Point::new(rect.x + rect.width / 2.0, rect.y),
        EdgeSide::Bottom => Point::new(rect.x + rect.width / 2.0, rect.bottom()),
    }
}

// ── Path shapes ─────────────────────────────────────────────────────

/// Path that leaves and enters perpendicular to the chosen sides: a straight
/// line for aligned opposite sides, a Z through the midpoint channel for
/// offset opposite sides, one bend for perpendicular sides.
fn orthogonal_route(start: Point, end: Point, start_side: EdgeSide, end_side: EdgeSide) -> Vec<Point> {
    let points = match (start_side.is_horizontal(), end_side.is_horizontal()) {
        (true, true) => {
            let mid_x = (start.x + end.x) / 2.0;
            vec![start, Point::new(mid_x, start.y), Point::new(mid_x, end.y), end]
        }
        (false, false) => {
            let mid_y = (start.y + end.y) / 2.0;
            vec![start, Point::new(start.x, mid_y), Point::new(end.x, mid_y), end]
        }
        (false, true) => vec![start, Point::new(start.x, end.y), end],
        (true, false) => vec![start, Point::new(end.x, start.y), end],
    };
    simplify(points)
}

/// Drops repeated points and bends that lie on a straight run.
fn simplify(points: Vec<Point>) -> Vec<Point> {
    let mut out: Vec<Point> = Vec::with_capacity(points.len());
    for point in points {
        if out.last().is_some_and(|last| last.approx_eq(point)) {
            continue;
        }
        if let [.., a, b] = out.as_slice() {
            let straight = ((a.x - b.x).abs() <= EPSILON && (b.x - point.x).abs() <= EPSILON)
                || ((a.y - b.y).abs() <= EPSILON && (b.y - point.y).abs() <= EPSILON);
            if straight {
                out.pop();
            }
        }
        out.push(point);
    }
    out
}

fn curve_route(
    start: Point,
    end: Point,
    start_side: EdgeSide,
    end_side: EdgeSide,
    config: &EdgeConfig,
) -> Vec<Point> {
    let margin = config.effective_curve_margin();
    let mid_x = (end.x - start.x) / 2.0;
    let mid_y = (end.y - start.y) / 2.0;
    let control = match (start_side.is_horizontal(), end_side.is_horizontal()) {
        (true, true) => vec![
            start,
            Point::new(start.x + mid_x * (1.0 - margin), start.y + mid_y * margin),
            Point::new(start.x + mid_x * (1.0 + margin), end.y - mid_y * margin),
            end,
        ],
        (false, false) if mid_y.abs() < CURVE_FLAT_HALF_SPAN => vec![
            start,
            Point::new(start.x + mid_x * margin, end.y),
            Point::new(end.x, start.y),
            end,
        ],
        (false, false) => vec![
            start,
            Point::new(start.x + mid_x * margin, start.y + mid_y * (1.0 - margin)),
            Point::new(end.x - mid_x * margin, start.y + mid_y * (1.0 + margin)),
            end,
        ],
        (false, true) => vec![
            start,
            Point::new(start.x + mid_x * margin, end.y - mid_y * margin),
            end,
        ],
        (true, false) => vec![
            start,
            Point::new(end.x - mid_x * margin, start.y + mid_y * margin),
            end,
        ],
    };
    basis_curve(&control, config.curve_samples)
}

/// Samples a uniform cubic B-spline through `control` into a polyline.
///
/// The curve starts at the first control point, ends at the last one and is
/// pulled towards the inner points without passing through them. Fewer than
/// three points yield a straight polyline.
pub fn basis_curve(control: &[Point], samples: usize) -> Vec<Point> {
    if control.len() < 3 {
        return control.to_vec();
    }
    let samples = samples.max(CURVE_MIN_SAMPLES);
    let last = control[control.len() - 1];
    let mut points = vec![control[0]];
    let mut current = (control[0].scale(5.0) + control[1]).scale(1.0 / 6.0);
    points.push(current);
    for i in 2..=control.len() {
        let p0 = control[i - 2];
        let p1 = control[i - 1];
        let p2 = control.get(i).copied().unwrap_or(p1);
        let b1 = (p0.scale(2.0) + p1).scale(1.0 / 3.0);
        let b2 = (p0 + p1.scale(2.0)).scale(1.0 / 3.0);
        let b3 = (p0 + p1.scale(4.0) + p2).scale(1.0 / 6.0);
        for step in 1..=samples {
            let t = step as f32 / samples as f32;
            points.push(cubic_point(current, b1, b2, b3, t));
        }
        current = b3;
    }
    if points.last().is_some_and(|point| !point.approx_eq(last)) {
        points.push(last);
    }
    points
}

fn cubic_point(p0: Point, p1: Point, p2: Point, p3: Point, t: f32) -> Point {
    let u = 1.0 - t;
    p0.scale(u * u * u) + p1.scale(3.0 * u * u * t) + p2.scale(3.0 * u * t * t) + p3.scale(t * t * t)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sides_pick_the_closest_facing_pair() {
        let a = Rect::new(0.0, 0.0, 100.0, 50.0);
        let right = Rect::new(300.0, 0.0, 100.0, 50.0);
        let below = Rect::new(0.0, 300.0, 100.0, 50.0);
        let elbow = RouteStyle::Elbow;
        assert_eq!(edge_sides(&a, &right, elbow), (EdgeSide::Right, EdgeSide::Left));
        assert_eq!(edge_sides(&right, &a, elbow), (EdgeSide::Left, EdgeSide::Right));
        assert_eq!(edge_sides(&a, &below, elbow), (EdgeSide::Bottom, EdgeSide::Top));
        assert_eq!(edge_sides(&below, &a, elbow), (EdgeSide::Top, EdgeSide::Bottom));
    }

    #[test]
    fn overlapping_spans_use_perpendicular_sides() {
        // staging below, archive above and overlapping it horizontally
        let staging = Rect::new(16.0, 90.0, 150.0, 44.0);
        let archive = Rect::new(116.0, 36.0, 220.0, 44.0);
        let (start_side, end_side) = edge_sides(&staging, &archive, RouteStyle::Elbow);
        assert_eq!((start_side, end_side), (EdgeSide::Top, EdgeSide::Left));
        let route = orthogonal_route(
            side_point(&staging, start_side),
            side_point(&archive, end_side),
            start_side,
            end_side,
        );
        assert_eq!(
            route,
            vec![Point::new(91.0, 90.0), Point::new(91.0, 58.0), Point::new(116.0, 58.0)]
        );

        let channel = edge_sides(&staging, &archive, RouteStyle::Channel);
        assert_eq!(channel, (EdgeSide::Top, EdgeSide::Bottom));
    }

    #[test]
    fn nested_boxes_fall_back_to_dominant_axis() {
        let outer = Rect::new(0.0, 0.0, 400.0, 200.0);
        let inner = Rect::new(100.0, 50.0, 50.0, 20.0);
        assert_eq!(
            edge_sides(&inner, &outer, RouteStyle::Elbow),
            (EdgeSide::Right, EdgeSide::Left)
        );
    }

    #[test]
    fn orthogonal_route_shapes() {
        let start = Point::new(100.0, 25.0);
        assert_eq!(
            orthogonal_route(start, Point::new(300.0, 25.0), EdgeSide::Right, EdgeSide::Left),
            vec![start, Point::new(300.0, 25.0)]
        );
        assert_eq!(
            orthogonal_route(Point::new(0.0, 0.0), Point::new(100.0, 40.0), EdgeSide::Right, EdgeSide::Left),
            vec![
                Point::new(0.0, 0.0),
                Point::new(50.0, 0.0),
                Point::new(50.0, 40.0),
                Point::new(100.0, 40.0)
            ]
        );
        assert_eq!(
            orthogonal_route(start, Point::new(300.0, 125.0), EdgeSide::Right, EdgeSide::Top),
            vec![start, Point::new(300.0, 25.0), Point::new(300.0, 125.0)]
        );
    }

    #[test]
    fn basis_curve_keeps_endpoints() {
        let control = [
            Point::new(0.0, 0.0),
            Point::new(40.0, 10.0),
            Point::new(60.0, 90.0),
            Point::new(100.0, 100.0),
        ];
        let curve = basis_curve(&control, 8);
        assert_eq!(curve.first(), Some(&control[0]));
        assert!(curve.last().unwrap().approx_eq(control[3]));
        assert!(curve.len() > control.len());
        for pair in curve.windows(2) {
            assert!(pair[1].x >= pair[0].x - EPSILON, "x must not go backwards");
        }
    }

    #[test]
    fn basis_curve_of_two_points_is_straight() {
        let control = [Point::new(0.0, 0.0), Point::new(10.0, 0.0)];
        assert_eq!(basis_curve(&control, 8), control.to_vec());
    }
}
