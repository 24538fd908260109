use std::f64::consts::PI;

mod path;

pub use path::{CubicPath, CubicSubpath, Path, Segment};

/// Space reserved around the ring for the curved title.
pub const TITLE_SIZE: f64 = 60.0;
/// Gap between the ring and the edge of its square.
pub const RING_MARGIN: f64 = 20.0;
pub const INNER_RADIUS_FACTOR: f64 = 0.5;
/// Arc length used for collapsed slices while paging.
pub const EMPTY_SLICE_EPSILON: f64 = 0.1;

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    pub fn lerp(self, to: Point, t: f64) -> Point {
        Point::new(
            self.x * (1.0 - t) + to.x * t,
            self.y * (1.0 - t) + to.y * t,
        )
    }

    pub fn distance(self, other: Point) -> f64 {
        (self.x - other.x).hypot(self.y - other.y)
    }

    fn polar(center: Point, radius: f64, angle: f64) -> Point {
        Point::new(
            center.x + radius * angle.cos(),
            center.y + radius * angle.sin(),
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Rect {
    pub x: f64,
    pub y: f64,
    pub w: f64,
    pub h: f64,
}

impl Rect {
    pub fn new(x: f64, y: f64, w: f64, h: f64) -> Self {
        Self { x, y, w, h }
    }

    pub fn lerp(self, to: Rect, t: f64) -> Rect {
        let origin = Point::new(self.x, self.y).lerp(Point::new(to.x, to.y), t);
        let size = Point::new(self.w, self.h).lerp(Point::new(to.w, to.h), t);
        Rect::new(origin.x, origin.y, size.x, size.y)
    }

    pub fn round(self) -> Rect {
        Rect::new(self.x.round(), self.y.round(), self.w.round(), self.h.round())
    }

    pub fn union(self, other: Rect) -> Rect {
        let x = self.x.min(other.x);
        let y = self.y.min(other.y);
        let right = (self.x + self.w).max(other.x + other.w);
        let bottom = (self.y + self.h).max(other.y + other.h);
        Rect::new(x, y, right - x, bottom - y)
    }

    pub fn center(&self) -> Point {
        Point::new(self.x + self.w / 2.0, self.y + self.h / 2.0)
    }
}

/// Which boundary of a slice a collapsed slice sits on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Edge {
    Start,
    End,
}

/// What lies under a point of the ring.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Hit {
    Root,
    Slice(usize),
}

/// Full circle as four clockwise quarter arcs, starting at the bottom.
pub fn circle_path(center: Point, radius: f64) -> Path {
    let (cx, cy, r) = (center.x, center.y, radius);
    Path::new()
        .move_to(Point::new(cx, cy + r))
        .arc_to(r, false, true, Point::new(cx - r, cy))
        .arc_to(r, false, true, Point::new(cx, cy - r))
        .arc_to(r, false, true, Point::new(cx + r, cy))
        .arc_to(r, false, true, Point::new(cx, cy + r))
        .close()
}

/// Angular span `[start, end)` of slice `index` out of `count`.
pub fn slice_span(index: usize, count: usize) -> (f64, f64) {
    let slice_angle = 2.0 * PI / count.max(1) as f64;
    let start = index as f64 * slice_angle;
    (start, start + slice_angle)
}

/// Annular sector for slice `index`. The outer arc sweeps clockwise and the
/// inner arc comes back counter-clockwise; a single slice is the whole disc.
pub fn sector_path(center: Point, inner: f64, outer: f64, index: usize, count: usize) -> Path {
    if count == 1 {
        return circle_path(center, outer);
    }

    let (start, end) = slice_span(index, count);
    let inner_start = Point::polar(center, inner, start);
    let inner_end = Point::polar(center, inner, end);
    let outer_start = Point::polar(center, outer, start);
    let outer_end = Point::polar(center, outer, end);

    Path::new()
        .move_to(outer_start)
        .arc_to(outer, false, true, outer_end)
        .line_to(inner_end)
        .arc_to(inner, false, false, inner_start)
        .close()
}

/// Degenerate sector sitting on one edge of slice `index`, used as the
/// start state of appearing slices and the end state of vanishing ones.
pub fn empty_sector_path(
    center: Point,
    inner: f64,
    outer: f64,
    index: usize,
    count: usize,
    edge: Edge,
) -> Path {
    let (start, end) = slice_span(index, count);
    let angle = match edge {
        Edge::Start => start,
        Edge::End => end,
    };
    let inner_at = Point::polar(center, inner, angle);
    let outer_at = Point::polar(center, outer, angle);
    let eps = EMPTY_SLICE_EPSILON;

    Path::new()
        .move_to(outer_at)
        .arc_to(outer, false, true, Point::new(outer_at.x + eps, outer_at.y + eps))
        .line_to(inner_at)
        .arc_to(inner, false, false, Point::new(inner_at.x - eps, inner_at.y - eps))
        .close()
}

/// Fixed circular geometry of one menu, derived from its pixel size.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Layout {
    pub size: f64,
    pub canvas_width: f64,
    pub canvas_height: f64,
    pub outer_radius: f64,
    pub inner_radius: f64,
    pub center: Point,
}

impl Layout {
    pub fn new(size: f64) -> Self {
        let outer_radius = (size - RING_MARGIN) / 2.0;
        Self {
            size,
            canvas_width: size + 2.0 * TITLE_SIZE,
            canvas_height: size + TITLE_SIZE,
            outer_radius,
            inner_radius: outer_radius * INNER_RADIUS_FACTOR,
            center: Point::new(size / 2.0 + TITLE_SIZE, size / 2.0 + TITLE_SIZE),
        }
    }

    pub fn outer_circle_path(&self) -> Path {
        circle_path(self.center, self.outer_radius)
    }

    pub fn inner_circle_path(&self) -> Path {
        circle_path(self.center, self.inner_radius)
    }

    pub fn slice_path(&self, index: usize, count: usize) -> Path {
        sector_path(
            self.center,
            self.inner_radius,
            self.outer_radius,
            index,
            count,
        )
    }

    pub fn empty_slice_path(&self, index: usize, count: usize, edge: Edge) -> Path {
        empty_sector_path(
            self.center,
            self.inner_radius,
            self.outer_radius,
            index,
            count,
            edge,
        )
    }

    /// Anchor of a slice's text icon: middle of the ring, middle of the span.
    pub fn slice_center(&self, index: usize, count: usize) -> Point {
        if count == 0 {
            return self.center;
        }
        let (start, end) = slice_span(index, count);
        let radius = (self.outer_radius + self.inner_radius) / 2.0;
        Point::polar(self.center, radius, (start + end) / 2.0)
    }

    pub fn hit(&self, point: Point, count: usize) -> Option<Hit> {
        let distance = point.distance(self.center);
        if distance <= self.inner_radius {
            return Some(Hit::Root);
        }
        if distance > self.outer_radius || count == 0 {
            return None;
        }

        let angle = (point.y - self.center.y)
            .atan2(point.x - self.center.x)
            .rem_euclid(2.0 * PI);
        let index = (angle / (2.0 * PI / count as f64)).floor() as usize;
        Some(Hit::Slice(index.min(count - 1)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TOLERANCE: f64 = 1e-9;

    #[test]
    fn test_layout_defaults() {
        let layout = Layout::new(400.0);
        assert_eq!(layout.outer_radius, 190.0);
        assert_eq!(layout.inner_radius, 95.0);
        assert_eq!(layout.center, Point::new(260.0, 260.0));
        assert_eq!(layout.canvas_width, 520.0);
        assert_eq!(layout.canvas_height, 460.0);
    }

    #[test]
    fn test_single_slice_is_outer_circle() {
        let layout = Layout::new(400.0);
        assert_eq!(layout.slice_path(0, 1), layout.outer_circle_path());
    }

    #[test]
    fn test_slice_spans_tile_the_circle() {
        for count in 2..=24 {
            let mut expected_start = 0.0;
            for index in 0..count {
                let (start, end) = slice_span(index, count);
                assert!((start - expected_start).abs() < TOLERANCE);
                assert!(end > start);
                expected_start = end;
            }
            assert!((expected_start - 2.0 * PI).abs() < TOLERANCE);
        }
    }

    #[test]
    fn test_sector_arc_directions() {
        let layout = Layout::new(400.0);
        let path = layout.slice_path(1, 4);
        let arcs: Vec<bool> = path
            .segments()
            .iter()
            .filter_map(|s| match s {
                Segment::Arc { sweep, .. } => Some(*sweep),
                _ => None,
            })
            .collect();
        assert_eq!(arcs, vec![true, false]);
    }

    #[test]
    fn test_quarter_slice_bbox() {
        let layout = Layout::new(400.0);
        // second quadrant in screen space: from 90° (south) to 180° (west)
        let bbox = layout.slice_path(1, 4).bounding_box().unwrap();
        assert!((bbox.x - (260.0 - 190.0)).abs() < 1e-6);
        assert!((bbox.y - 260.0).abs() < 1e-6);
        assert!((bbox.w - 190.0).abs() < 1e-6);
        assert!((bbox.h - 190.0).abs() < 1e-6);
    }

    #[test]
    fn test_empty_slice_sits_on_edge() {
        let layout = Layout::new(400.0);
        let path = layout.empty_slice_path(0, 4, Edge::End);
        match path.segments()[0] {
            Segment::MoveTo(p) => {
                assert!((p.x - 260.0).abs() < 1e-9);
                assert!((p.y - 450.0).abs() < 1e-9);
            }
            other => panic!("unexpected first segment {other:?}"),
        }
        let bbox = path.bounding_box().unwrap();
        assert!(bbox.w < layout.outer_radius);

        // the start edge of slice 0 points east
        let path = layout.empty_slice_path(0, 4, Edge::Start);
        match path.segments()[0] {
            Segment::MoveTo(p) => {
                assert!((p.x - 450.0).abs() < 1e-9);
                assert!((p.y - 260.0).abs() < 1e-9);
            }
            other => panic!("unexpected first segment {other:?}"),
        }
        let bbox = path.bounding_box().unwrap();
        assert!(bbox.h < layout.outer_radius);
        assert!(bbox.x >= layout.center.x);

        // the start edge of one slice is the end edge of the one before it
        let start = layout.empty_slice_path(2, 4, Edge::Start).segments()[0];
        let end = layout.empty_slice_path(1, 4, Edge::End).segments()[0];
        match (start, end) {
            (Segment::MoveTo(a), Segment::MoveTo(b)) => assert!(a.distance(b) < 1e-9),
            other => panic!("unexpected first segments {other:?}"),
        }
    }

    #[test]
    fn test_hit_testing() {
        let layout = Layout::new(400.0);
        let c = layout.center;
        assert_eq!(layout.hit(c, 4), Some(Hit::Root));
        assert_eq!(layout.hit(Point::new(c.x + 150.0, c.y + 1.0), 4), Some(Hit::Slice(0)));
        assert_eq!(layout.hit(Point::new(c.x - 1.0, c.y + 150.0), 4), Some(Hit::Slice(1)));
        assert_eq!(layout.hit(Point::new(c.x + 1.0, c.y - 150.0), 4), Some(Hit::Slice(3)));
        assert_eq!(layout.hit(Point::new(c.x + 300.0, c.y), 4), None);
        assert_eq!(layout.hit(Point::new(c.x + 150.0, c.y), 0), None);
    }

    #[test]
    fn test_circle_path_string() {
        let path = circle_path(Point::new(10.0, 10.0), 5.0);
        assert_eq!(
            path.to_string(),
            "M 10 15 A 5 5 0 0 1 5 10 A 5 5 0 0 1 10 5 A 5 5 0 0 1 15 10 A 5 5 0 0 1 10 15 Z"
        );
    }
}
