use super::{Point, Rect};
use std::f64::consts::{FRAC_PI_2, PI};
use std::fmt;

/// One drawing command. Arcs are circular and unrotated, which is all the
/// menu ever draws.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Segment {
    MoveTo(Point),
    LineTo(Point),
    Arc {
        radius: f64,
        large_arc: bool,
        sweep: bool,
        to: Point,
    },
    CubicTo {
        c1: Point,
        c2: Point,
        to: Point,
    },
    Close,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Path {
    segments: Vec<Segment>,
}

impl Path {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    pub fn move_to(mut self, to: Point) -> Self {
        self.segments.push(Segment::MoveTo(to));
        self
    }

    pub fn line_to(mut self, to: Point) -> Self {
        self.segments.push(Segment::LineTo(to));
        self
    }

    pub fn arc_to(mut self, radius: f64, large_arc: bool, sweep: bool, to: Point) -> Self {
        self.segments.push(Segment::Arc {
            radius,
            large_arc,
            sweep,
            to,
        });
        self
    }

    pub fn cubic_to(mut self, c1: Point, c2: Point, to: Point) -> Self {
        self.segments.push(Segment::CubicTo { c1, c2, to });
        self
    }

    pub fn close(mut self) -> Self {
        self.segments.push(Segment::Close);
        self
    }

    /// Flattens every segment into cubic Bézier curves.
    pub fn to_cubics(&self) -> CubicPath {
        let mut out = CubicPath::default();
        let mut current = Point::default();
        let mut start = Point::default();

        for segment in &self.segments {
            match *segment {
                Segment::MoveTo(p) => {
                    out.subpaths.push(CubicSubpath::new(p));
                    current = p;
                    start = p;
                }
                Segment::LineTo(p) => {
                    out.open_at(current).curves.push(line_curve(current, p));
                    current = p;
                }
                Segment::CubicTo { c1, c2, to } => {
                    out.open_at(current).curves.push([c1, c2, to]);
                    current = to;
                }
                Segment::Arc {
                    radius,
                    large_arc,
                    sweep,
                    to,
                } => {
                    let sub = out.open_at(current);
                    sub.curves
                        .extend(arc_curves(current, radius, large_arc, sweep, to));
                    current = to;
                }
                Segment::Close => {
                    let sub = out.open_at(current);
                    if current != start {
                        sub.curves.push(line_curve(current, start));
                    }
                    sub.closed = true;
                    current = start;
                }
            }
        }
        out
    }

    /// Exact bounding box, or `None` for an empty path.
    pub fn bounding_box(&self) -> Option<Rect> {
        self.to_cubics().bounding_box()
    }
}

impl From<CubicPath> for Path {
    fn from(cubics: CubicPath) -> Self {
        let mut path = Path::new();
        for sub in cubics.subpaths {
            path = path.move_to(sub.start);
            for [c1, c2, to] in sub.curves {
                path = path.cubic_to(c1, c2, to);
            }
            if sub.closed {
                path = path.close();
            }
        }
        path
    }
}

/// Renders as an SVG `d` attribute.
impl fmt::Display for Path {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, segment) in self.segments.iter().enumerate() {
            if i > 0 {
                f.write_str(" ")?;
            }
            match segment {
                Segment::MoveTo(p) => write!(f, "M {} {}", p.x, p.y)?,
                Segment::LineTo(p) => write!(f, "L {} {}", p.x, p.y)?,
                Segment::Arc {
                    radius,
                    large_arc,
                    sweep,
                    to,
                } => write!(
                    f,
                    "A {r} {r} 0 {} {} {} {}",
                    u8::from(*large_arc),
                    u8::from(*sweep),
                    to.x,
                    to.y,
                    r = radius
                )?,
                Segment::CubicTo { c1, c2, to } => write!(
                    f,
                    "C {} {} {} {} {} {}",
                    c1.x, c1.y, c2.x, c2.y, to.x, to.y
                )?,
                Segment::Close => f.write_str("Z")?,
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct CubicSubpath {
    pub start: Point,
    pub curves: Vec<[Point; 3]>,
    pub closed: bool,
}

impl CubicSubpath {
    fn new(start: Point) -> Self {
        Self {
            start,
            curves: Vec::new(),
            closed: false,
        }
    }

    fn end(&self) -> Point {
        self.curves.last().map(|c| c[2]).unwrap_or(self.start)
    }

    fn padded(&self, len: usize) -> Vec<[Point; 3]> {
        let end = self.end();
        let mut curves = self.curves.clone();
        curves.resize(len.max(curves.len()), [end, end, end]);
        curves
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct CubicPath {
    pub subpaths: Vec<CubicSubpath>,
}

impl CubicPath {
    fn open_at(&mut self, current: Point) -> &mut CubicSubpath {
        if self.subpaths.last().is_none_or(|s| s.closed) {
            self.subpaths.push(CubicSubpath::new(current));
        }
        let last = self.subpaths.len() - 1;
        &mut self.subpaths[last]
    }

    fn last_point(&self) -> Point {
        self.subpaths.last().map(CubicSubpath::end).unwrap_or_default()
    }

    /// Interpolates towards `to`. Both sides are padded with degenerate
    /// curves so paths of different shapes can morph into each other.
    pub fn lerp(&self, to: &CubicPath, t: f64) -> CubicPath {
        let count = self.subpaths.len().max(to.subpaths.len());
        let subpaths = (0..count)
            .map(|i| {
                let a = self
                    .subpaths
                    .get(i)
                    .cloned()
                    .unwrap_or_else(|| CubicSubpath::new(self.last_point()));
                let b = to
                    .subpaths
                    .get(i)
                    .cloned()
                    .unwrap_or_else(|| CubicSubpath::new(to.last_point()));
                let len = a.curves.len().max(b.curves.len());
                let curves = a
                    .padded(len)
                    .into_iter()
                    .zip(b.padded(len))
                    .map(|(ca, cb)| {
                        [
                            ca[0].lerp(cb[0], t),
                            ca[1].lerp(cb[1], t),
                            ca[2].lerp(cb[2], t),
                        ]
                    })
                    .collect();
                CubicSubpath {
                    start: a.start.lerp(b.start, t),
                    curves,
                    closed: if t < 1.0 { a.closed || b.closed } else { b.closed },
                }
            })
            .collect();
        CubicPath { subpaths }
    }

    pub fn bounding_box(&self) -> Option<Rect> {
        let mut bounds: Option<(Point, Point)> = None;
        let mut include = |p: Point| {
            bounds = Some(match bounds {
                None => (p, p),
                Some((min, max)) => (
                    Point::new(min.x.min(p.x), min.y.min(p.y)),
                    Point::new(max.x.max(p.x), max.y.max(p.y)),
                ),
            });
        };

        for sub in &self.subpaths {
            include(sub.start);
            let mut p0 = sub.start;
            for &[p1, p2, p3] in &sub.curves {
                include(p3);
                for t in cubic_extrema(p0.x, p1.x, p2.x, p3.x)
                    .into_iter()
                    .chain(cubic_extrema(p0.y, p1.y, p2.y, p3.y))
                    .flatten()
                {
                    include(cubic_point(p0, p1, p2, p3, t));
                }
                p0 = p3;
            }
        }

        bounds.map(|(min, max)| Rect::new(min.x, min.y, max.x - min.x, max.y - min.y))
    }
}

fn line_curve(from: Point, to: Point) -> [Point; 3] {
    [from.lerp(to, 1.0 / 3.0), from.lerp(to, 2.0 / 3.0), to]
}

/// Endpoint-to-center conversion for a circular arc, split into pieces of at
/// most a quarter turn.
fn arc_curves(
    from: Point,
    radius: f64,
    large_arc: bool,
    sweep: bool,
    to: Point,
) -> Vec<[Point; 3]> {
    if from == to {
        return Vec::new();
    }
    if radius <= 0.0 {
        return vec![line_curve(from, to)];
    }

    let hx = (from.x - to.x) / 2.0;
    let hy = (from.y - to.y) / 2.0;
    let chord_sq = hx * hx + hy * hy;
    let r = radius.max(chord_sq.sqrt());
    let r_sq = r * r;

    let sign = if large_arc != sweep { 1.0 } else { -1.0 };
    let coef = sign * ((r_sq - chord_sq) / chord_sq).max(0.0).sqrt();
    let (cx_p, cy_p) = (coef * hy, -coef * hx);
    let center = Point::new(cx_p + (from.x + to.x) / 2.0, cy_p + (from.y + to.y) / 2.0);

    let start = (from.y - center.y).atan2(from.x - center.x);
    let end = (to.y - center.y).atan2(to.x - center.x);
    let mut delta = end - start;
    if sweep && delta < 0.0 {
        delta += 2.0 * PI;
    } else if !sweep && delta > 0.0 {
        delta -= 2.0 * PI;
    }

    let pieces = (delta.abs() / FRAC_PI_2 - 1e-9).ceil().max(1.0) as usize;
    let step = delta / pieces as f64;
    let k = 4.0 / 3.0 * (step / 4.0).tan();

    (0..pieces)
        .map(|i| {
            let a = start + step * i as f64;
            let b = a + step;
            let p0 = Point::new(center.x + r * a.cos(), center.y + r * a.sin());
            let p3 = if i + 1 == pieces {
                to
            } else {
                Point::new(center.x + r * b.cos(), center.y + r * b.sin())
            };
            let c1 = Point::new(p0.x - k * r * a.sin(), p0.y + k * r * a.cos());
            let c2 = Point::new(
                center.x + r * b.cos() + k * r * b.sin(),
                center.y + r * b.sin() - k * r * b.cos(),
            );
            [c1, c2, p3]
        })
        .collect()
}

/// Parameters in (0, 1) where one coordinate of a cubic has a local extremum.
fn cubic_extrema(p0: f64, p1: f64, p2: f64, p3: f64) -> [Option<f64>; 2] {
    let a = -p0 + 3.0 * p1 - 3.0 * p2 + p3;
    let b = 2.0 * (p0 - 2.0 * p1 + p2);
    let c = p1 - p0;
    let inside = |t: f64| (t > 0.0 && t < 1.0).then_some(t);

    if a.abs() < 1e-12 {
        if b.abs() < 1e-12 {
            return [None, None];
        }
        return [inside(-c / b), None];
    }

    let disc = b * b - 4.0 * a * c;
    if disc < 0.0 {
        return [None, None];
    }
    let root = disc.sqrt();
    [inside((-b + root) / (2.0 * a)), inside((-b - root) / (2.0 * a))]
}

fn cubic_point(p0: Point, p1: Point, p2: Point, p3: Point, t: f64) -> Point {
    let mt = 1.0 - t;
    let (a, b, c, d) = (mt * mt * mt, 3.0 * mt * mt * t, 3.0 * mt * t * t, t * t * t);
    Point::new(
        a * p0.x + b * p1.x + c * p2.x + d * p3.x,
        a * p0.y + b * p1.y + c * p2.y + d * p3.y,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn approx(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-6
    }

    #[test]
    fn test_display_matches_svg_syntax() {
        let path = Path::new()
            .move_to(Point::new(10.0, 20.0))
            .arc_to(5.0, false, true, Point::new(15.0, 25.0))
            .line_to(Point::new(1.5, 2.0))
            .close();
        assert_eq!(path.to_string(), "M 10 20 A 5 5 0 0 1 15 25 L 1.5 2 Z");
    }

    #[test]
    fn test_half_circle_bounding_box() {
        // clockwise (screen) from west to east over the top
        let path = Path::new()
            .move_to(Point::new(-10.0, 0.0))
            .arc_to(10.0, false, true, Point::new(10.0, 0.0));
        let bbox = path.bounding_box().unwrap();
        assert!(approx(bbox.x, -10.0));
        assert!(approx(bbox.y, -10.0));
        assert!(approx(bbox.w, 20.0));
        assert!(approx(bbox.h, 10.0));
    }

    #[test]
    fn test_opposite_sweep_takes_other_side() {
        let path = Path::new()
            .move_to(Point::new(-10.0, 0.0))
            .arc_to(10.0, false, false, Point::new(10.0, 0.0));
        let bbox = path.bounding_box().unwrap();
        assert!(approx(bbox.y, 0.0));
        assert!(approx(bbox.h, 10.0));
    }

    #[test]
    fn test_arc_pieces_stay_on_circle() {
        let cubics = Path::new()
            .move_to(Point::new(10.0, 0.0))
            .arc_to(10.0, true, true, Point::new(0.0, -10.0))
            .to_cubics();
        let curves = &cubics.subpaths[0].curves;
        assert_eq!(curves.len(), 3);
        for curve in curves {
            assert!(approx(curve[2].x.hypot(curve[2].y), 10.0));
        }
    }

    #[test]
    fn test_lerp_pads_shorter_path() {
        let line = Path::new()
            .move_to(Point::new(0.0, 0.0))
            .line_to(Point::new(10.0, 0.0))
            .to_cubics();
        let square = Path::new()
            .move_to(Point::new(0.0, 0.0))
            .line_to(Point::new(10.0, 0.0))
            .line_to(Point::new(10.0, 10.0))
            .line_to(Point::new(0.0, 10.0))
            .close()
            .to_cubics();

        let half = line.lerp(&square, 0.5);
        assert_eq!(half.subpaths[0].curves.len(), 4);

        let done = line.lerp(&square, 1.0);
        assert_eq!(done, square);
    }

    #[test]
    fn test_close_returns_to_start() {
        let cubics = Path::new()
            .move_to(Point::new(0.0, 0.0))
            .line_to(Point::new(4.0, 0.0))
            .line_to(Point::new(4.0, 4.0))
            .close()
            .to_cubics();
        let sub = &cubics.subpaths[0];
        assert!(sub.closed);
        assert_eq!(sub.end(), Point::new(0.0, 0.0));
    }
}
