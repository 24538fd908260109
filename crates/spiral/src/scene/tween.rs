use crate::geometry::{CubicPath, Path, Point, Rect};
use crate::scene::{AnimationId, ElementId};
use std::time::Duration;

/// End value of an animation.
#[derive(Debug, Clone, PartialEq)]
pub enum Target {
    Path(Path),
    Opacity(f64),
    ImageRect(Rect),
    TextPosition(Point),
}

impl Target {
    pub fn kind(&self) -> AttrKind {
        match self {
            Self::Path(_) => AttrKind::Path,
            Self::Opacity(_) => AttrKind::Opacity,
            Self::ImageRect(_) => AttrKind::ImageRect,
            Self::TextPosition(_) => AttrKind::TextPosition,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AttrKind {
    Path,
    Opacity,
    ImageRect,
    TextPosition,
}

/// Interpolation endpoints, prepared once when the tween starts.
#[derive(Debug, Clone)]
pub(crate) enum Track {
    Path {
        from: CubicPath,
        to: CubicPath,
        exact: Path,
    },
    Opacity(f64, f64),
    ImageRect(Rect, Rect),
    TextPosition(Point, Point),
}

/// Interpolated value at some progress.
#[derive(Debug, Clone)]
pub(crate) enum Sample {
    Path(Path),
    Opacity(f64),
    ImageRect(Rect),
    TextPosition(Point),
}

impl Track {
    pub(crate) fn sample(&self, t: f64) -> Sample {
        match self {
            Self::Path { exact, .. } if t >= 1.0 => Sample::Path(exact.clone()),
            Self::Path { from, to, .. } => Sample::Path(Path::from(from.lerp(to, t))),
            Self::Opacity(a, b) => Sample::Opacity(a + (b - a) * t),
            Self::ImageRect(a, b) => Sample::ImageRect(a.lerp(*b, t)),
            Self::TextPosition(a, b) => Sample::TextPosition(a.lerp(*b, t)),
        }
    }
}

#[derive(Debug, Clone)]
pub(crate) struct Tween {
    pub id: AnimationId,
    pub element: ElementId,
    pub kind: AttrKind,
    pub track: Track,
    pub start: Duration,
    pub duration: Duration,
    /// A later tween on the same attribute took over; this one only reports
    /// completion.
    pub superseded: bool,
}

impl Tween {
    /// Linear progress in `[0, 1]`.
    pub fn progress(&self, now: Duration) -> f64 {
        if self.duration.is_zero() {
            return 1.0;
        }
        let elapsed = now.saturating_sub(self.start);
        (elapsed.as_secs_f64() / self.duration.as_secs_f64()).clamp(0.0, 1.0)
    }

    pub fn end(&self) -> Duration {
        self.start + self.duration
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tween(start_ms: u64, duration_ms: u64) -> Tween {
        Tween {
            id: AnimationId::new(0),
            element: ElementId::new(0),
            kind: AttrKind::Opacity,
            track: Track::Opacity(0.0, 1.0),
            start: Duration::from_millis(start_ms),
            duration: Duration::from_millis(duration_ms),
            superseded: false,
        }
    }

    #[test]
    fn test_progress_is_linear_and_clamped() {
        let t = tween(100, 400);
        assert_eq!(t.progress(Duration::from_millis(50)), 0.0);
        assert_eq!(t.progress(Duration::from_millis(300)), 0.5);
        assert_eq!(t.progress(Duration::from_millis(900)), 1.0);
    }

    #[test]
    fn test_zero_duration_completes_immediately() {
        assert_eq!(tween(100, 0).progress(Duration::from_millis(100)), 1.0);
    }

    #[test]
    fn test_path_sample_lands_on_exact_target() {
        let to = Path::new()
            .move_to(Point::new(0.0, 0.0))
            .arc_to(5.0, false, true, Point::new(10.0, 0.0));
        let track = Track::Path {
            from: Path::new()
                .move_to(Point::new(0.0, 0.0))
                .line_to(Point::new(1.0, 1.0))
                .to_cubics(),
            to: to.to_cubics(),
            exact: to.clone(),
        };
        match track.sample(1.0) {
            Sample::Path(p) => assert_eq!(p, to),
            other => panic!("unexpected sample {other:?}"),
        }
    }
}
