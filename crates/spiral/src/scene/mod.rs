//! Retained drawing surface: an element tree plus tweened attributes.
//!
//! Hosts paint the tree however they like; the menu only ever talks to
//! this module.

use crate::geometry::{Path, Point, Rect};
use derive_more::{Display, From, Into};
use palette::Srgba;
use std::collections::HashMap;
use std::time::Duration;

mod tween;

pub use tween::{AttrKind, Target};
use tween::{Sample, Track, Tween};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Display, From, Into)]
pub struct ElementId(u64);

crate::impl_id_newtype!(ElementId);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Display, From, Into)]
pub struct AnimationId(u64);

crate::impl_id_newtype!(AnimationId);

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Stroke {
    pub color: Srgba<f64>,
    pub width: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub enum TextPlacement {
    /// Centered on a point.
    At(Point),
    /// Laid along a path, centered at `offset` (fraction of its length) and
    /// shifted by `dy` perpendicular to it.
    OnPath { path: Path, offset: f64, dy: f64 },
}

#[derive(Debug, Clone, PartialEq)]
pub enum ElementKind {
    Group,
    Shape {
        d: Path,
        fill: Option<Srgba<f64>>,
        stroke: Option<Stroke>,
        /// Translation applied when painting.
        offset: Point,
    },
    /// Bitmap scaled to cover `rect`, optionally clipped by a clip path.
    Image {
        href: String,
        rect: Rect,
        clip: Option<ElementId>,
    },
    Text {
        content: String,
        placement: TextPlacement,
    },
    /// Holds the shapes an image is clipped to; never painted itself.
    ClipPath,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Element {
    pub kind: ElementKind,
    pub parent: Option<ElementId>,
    pub children: Vec<ElementId>,
    pub classes: Vec<String>,
    pub title: Option<String>,
    pub opacity: f64,
    pub visible: bool,
}

impl Element {
    fn new(kind: ElementKind, parent: Option<ElementId>) -> Self {
        Self {
            kind,
            parent,
            children: Vec::new(),
            classes: Vec::new(),
            title: None,
            opacity: 1.0,
            visible: true,
        }
    }

    pub fn has_class(&self, class: &str) -> bool {
        self.classes.iter().any(|c| c == class)
    }
}

#[derive(Debug)]
pub struct Scene {
    width: f64,
    height: f64,
    elements: HashMap<ElementId, Element>,
    root: ElementId,
    defs: ElementId,
    next_element: u64,
    tweens: Vec<Tween>,
    next_animation: u64,
    now: Duration,
}

impl Scene {
    pub fn new(width: f64, height: f64) -> Self {
        let root = ElementId::new(0);
        let defs = ElementId::new(1);
        let mut elements = HashMap::new();
        elements.insert(root, Element::new(ElementKind::Group, None));
        elements.insert(defs, Element::new(ElementKind::Group, None));

        Self {
            width,
            height,
            elements,
            root,
            defs,
            next_element: 2,
            tweens: Vec::new(),
            next_animation: 0,
            now: Duration::ZERO,
        }
    }

    pub fn width(&self) -> f64 {
        self.width
    }

    pub fn height(&self) -> f64 {
        self.height
    }

    pub fn root(&self) -> ElementId {
        self.root
    }

    pub fn now(&self) -> Duration {
        self.now
    }

    pub fn get(&self, id: ElementId) -> Option<&Element> {
        self.elements.get(&id)
    }

    pub fn contains(&self, id: ElementId) -> bool {
        self.elements.contains_key(&id)
    }

    pub fn len(&self) -> usize {
        self.elements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }

    fn insert(&mut self, parent: ElementId, kind: ElementKind) -> ElementId {
        let id = ElementId::new(self.next_element);
        self.next_element += 1;
        self.elements.insert(id, Element::new(kind, Some(parent)));
        if let Some(p) = self.elements.get_mut(&parent) {
            p.children.push(id);
        }
        id
    }

    pub fn group(&mut self, parent: ElementId) -> ElementId {
        self.insert(parent, ElementKind::Group)
    }

    pub fn path(&mut self, parent: ElementId, d: Path) -> ElementId {
        self.insert(
            parent,
            ElementKind::Shape {
                d,
                fill: None,
                stroke: None,
                offset: Point::default(),
            },
        )
    }

    pub fn image(&mut self, parent: ElementId, href: impl Into<String>, rect: Rect) -> ElementId {
        self.insert(
            parent,
            ElementKind::Image {
                href: href.into(),
                rect,
                clip: None,
            },
        )
    }

    pub fn text(
        &mut self,
        parent: ElementId,
        content: impl Into<String>,
        placement: TextPlacement,
    ) -> ElementId {
        self.insert(
            parent,
            ElementKind::Text {
                content: content.into(),
                placement,
            },
        )
    }

    /// Clips `image` to `shape`, moving the shape into a new clip path.
    /// Returns the clip path's id.
    pub fn clip(&mut self, image: ElementId, shape: ElementId) -> Option<ElementId> {
        if !self.contains(image) || !self.contains(shape) {
            return None;
        }
        let clip = self.insert(self.defs, ElementKind::ClipPath);
        self.reparent(shape, clip, None);
        if let Some(Element {
            kind: ElementKind::Image { clip: c, .. },
            ..
        }) = self.elements.get_mut(&image)
        {
            *c = Some(clip);
        }
        Some(clip)
    }

    /// Shape an image is clipped to.
    pub fn clip_shape(&self, image: ElementId) -> Option<ElementId> {
        match self.get(image)?.kind {
            ElementKind::Image { clip: Some(clip), .. } => {
                self.get(clip)?.children.first().copied()
            }
            _ => None,
        }
    }

    pub fn parent(&self, id: ElementId) -> Option<ElementId> {
        self.get(id)?.parent
    }

    pub fn is_clip_path(&self, id: ElementId) -> bool {
        self.get(id)
            .is_some_and(|e| matches!(e.kind, ElementKind::ClipPath))
    }

    fn detach(&mut self, id: ElementId) {
        if let Some(parent) = self.parent(id)
            && let Some(p) = self.elements.get_mut(&parent)
        {
            p.children.retain(|c| *c != id);
        }
    }

    /// Moves `id` under `parent`, at the end or right after `after`.
    fn reparent(&mut self, id: ElementId, parent: ElementId, after: Option<ElementId>) {
        if !self.contains(id) || !self.contains(parent) {
            return;
        }
        self.detach(id);
        if let Some(p) = self.elements.get_mut(&parent) {
            let at = after
                .and_then(|a| p.children.iter().position(|c| *c == a))
                .map(|i| i + 1)
                .unwrap_or(p.children.len());
            p.children.insert(at, id);
        }
        if let Some(e) = self.elements.get_mut(&id) {
            e.parent = Some(parent);
        }
    }

    /// Raises `id` to the top of `parent`'s children.
    pub fn append(&mut self, parent: ElementId, id: ElementId) {
        self.reparent(id, parent, None);
    }

    /// Places `id` directly above `sibling`.
    pub fn insert_after(&mut self, sibling: ElementId, id: ElementId) {
        if let Some(parent) = self.parent(sibling) {
            self.reparent(id, parent, Some(sibling));
        }
    }

    /// Removes an element and everything below it. Running tweens on removed
    /// elements still finish and report completion.
    pub fn remove(&mut self, id: ElementId) {
        if id == self.root || id == self.defs {
            return;
        }
        self.detach(id);
        let mut stack = vec![id];
        while let Some(next) = stack.pop() {
            if let Some(e) = self.elements.remove(&next) {
                stack.extend(e.children);
            }
        }
    }

    pub fn add_class(&mut self, id: ElementId, class: &str) {
        if let Some(e) = self.elements.get_mut(&id)
            && !e.has_class(class)
        {
            e.classes.push(class.to_string());
        }
    }

    pub fn has_class(&self, id: ElementId, class: &str) -> bool {
        self.get(id).is_some_and(|e| e.has_class(class))
    }

    /// First descendant of `id` carrying `class`.
    pub fn select(&self, id: ElementId, class: &str) -> Option<ElementId> {
        let element = self.get(id)?;
        element.children.iter().find_map(|&c| {
            if self.has_class(c, class) {
                Some(c)
            } else {
                self.select(c, class)
            }
        })
    }

    pub fn set_title(&mut self, id: ElementId, title: impl Into<String>) {
        if let Some(e) = self.elements.get_mut(&id) {
            e.title = Some(title.into());
        }
    }

    pub fn set_opacity(&mut self, id: ElementId, opacity: f64) {
        if let Some(e) = self.elements.get_mut(&id) {
            e.opacity = opacity;
        }
    }

    pub fn set_visible(&mut self, id: ElementId, visible: bool) {
        if let Some(e) = self.elements.get_mut(&id) {
            e.visible = visible;
        }
    }

    fn kind_mut(&mut self, id: ElementId) -> Option<&mut ElementKind> {
        self.elements.get_mut(&id).map(|e| &mut e.kind)
    }

    pub fn set_path(&mut self, id: ElementId, path: Path) {
        if let Some(ElementKind::Shape { d, .. }) = self.kind_mut(id) {
            *d = path;
        }
    }

    pub fn set_fill(&mut self, id: ElementId, color: Option<Srgba<f64>>) {
        if let Some(ElementKind::Shape { fill, .. }) = self.kind_mut(id) {
            *fill = color;
        }
    }

    pub fn set_stroke(&mut self, id: ElementId, value: Option<Stroke>) {
        if let Some(ElementKind::Shape { stroke, .. }) = self.kind_mut(id) {
            *stroke = value;
        }
    }

    pub fn set_offset(&mut self, id: ElementId, to: Point) {
        if let Some(ElementKind::Shape { offset, .. }) = self.kind_mut(id) {
            *offset = to;
        }
    }

    pub fn set_text(&mut self, id: ElementId, text: impl Into<String>) {
        if let Some(ElementKind::Text { content, .. }) = self.kind_mut(id) {
            *content = text.into();
        }
    }

    pub fn set_text_position(&mut self, id: ElementId, to: Point) {
        if let Some(ElementKind::Text { placement, .. }) = self.kind_mut(id) {
            *placement = TextPlacement::At(to);
        }
    }

    pub fn set_image_href(&mut self, id: ElementId, url: impl Into<String>) {
        if let Some(ElementKind::Image { href, .. }) = self.kind_mut(id) {
            *href = url.into();
        }
    }

    pub fn set_image_rect(&mut self, id: ElementId, to: Rect) {
        if let Some(ElementKind::Image { rect, .. }) = self.kind_mut(id) {
            *rect = to;
        }
    }

    pub fn path_of(&self, id: ElementId) -> Option<&Path> {
        match &self.get(id)?.kind {
            ElementKind::Shape { d, .. } => Some(d),
            _ => None,
        }
    }

    pub fn bbox(&self, id: ElementId) -> Option<Rect> {
        let element = self.get(id)?;
        match &element.kind {
            ElementKind::Shape { d, offset, .. } => d
                .bounding_box()
                .map(|b| Rect::new(b.x + offset.x, b.y + offset.y, b.w, b.h)),
            ElementKind::Image { rect, .. } => Some(*rect),
            ElementKind::Text {
                placement: TextPlacement::At(p),
                ..
            } => Some(Rect::new(p.x, p.y, 0.0, 0.0)),
            ElementKind::Text { .. } => None,
            ElementKind::Group | ElementKind::ClipPath => element
                .children
                .iter()
                .filter_map(|&c| self.bbox(c))
                .reduce(Rect::union),
        }
    }

    /// Path the shape will have once its running tweens finish.
    pub fn pending_path(&self, id: ElementId) -> Option<Path> {
        self.active_tween(id, AttrKind::Path)
            .and_then(|t| match &t.track {
                Track::Path { exact, .. } => Some(exact.clone()),
                _ => None,
            })
            .or_else(|| self.path_of(id).cloned())
    }

    /// Bounding box of [`Scene::pending_path`].
    pub fn pending_bbox(&self, id: ElementId) -> Option<Rect> {
        self.pending_path(id)?.bounding_box()
    }

    /// Start and length of the tween currently driving an attribute.
    pub fn timing(&self, id: ElementId, kind: AttrKind) -> Option<(Duration, Duration)> {
        self.active_tween(id, kind).map(|t| (t.start, t.duration))
    }

    fn active_tween(&self, id: ElementId, kind: AttrKind) -> Option<&Tween> {
        self.tweens
            .iter()
            .rev()
            .find(|t| t.element == id && t.kind == kind && !t.superseded)
    }

    fn current_track(&self, id: ElementId, target: Target) -> Option<Track> {
        let kind = &self.get(id)?.kind;
        let track = match (target, kind) {
            (Target::Path(to), ElementKind::Shape { d, .. }) => Track::Path {
                from: d.to_cubics(),
                to: to.to_cubics(),
                exact: to,
            },
            (Target::Opacity(to), _) => Track::Opacity(self.get(id)?.opacity, to),
            (Target::ImageRect(to), ElementKind::Image { rect, .. }) => {
                Track::ImageRect(*rect, to)
            }
            (
                Target::TextPosition(to),
                ElementKind::Text {
                    placement: TextPlacement::At(p),
                    ..
                },
            ) => Track::TextPosition(*p, to),
            _ => return None,
        };
        Some(track)
    }

    /// Starts a linear tween from the current value. Returns immediately;
    /// completion is reported by a later [`Scene::advance`].
    pub fn animate(&mut self, id: ElementId, target: Target, duration: Duration) -> AnimationId {
        self.animate_from(id, target, self.now, duration)
    }

    /// Like [`Scene::animate`] but with an explicit start time, so a tween
    /// can run in lock-step with one that began earlier.
    pub fn animate_from(
        &mut self,
        id: ElementId,
        target: Target,
        start: Duration,
        duration: Duration,
    ) -> AnimationId {
        let animation = AnimationId::new(self.next_animation);
        self.next_animation += 1;

        let kind = target.kind();
        let Some(track) = self.current_track(id, target) else {
            log::debug!("element {id} cannot animate {kind:?}; completing at once");
            self.tweens.push(Tween {
                id: animation,
                element: id,
                kind,
                track: Track::Opacity(0.0, 0.0),
                start: self.now,
                duration: Duration::ZERO,
                superseded: true,
            });
            return animation;
        };

        for t in self
            .tweens
            .iter_mut()
            .filter(|t| t.element == id && t.kind == kind)
        {
            t.superseded = true;
        }
        self.tweens.push(Tween {
            id: animation,
            element: id,
            kind,
            track,
            start,
            duration,
            superseded: false,
        });
        animation
    }

    pub fn is_animating(&self) -> bool {
        !self.tweens.is_empty()
    }

    /// Time at which the last running tween ends.
    pub fn settled_at(&self) -> Option<Duration> {
        self.tweens.iter().map(Tween::end).max()
    }

    /// Moves the clock to `now`, applies every running tween and returns the
    /// ones that finished, in the order they were started.
    pub fn advance(&mut self, now: Duration) -> Vec<AnimationId> {
        self.now = self.now.max(now);
        let tweens = std::mem::take(&mut self.tweens);
        let mut finished = Vec::new();

        for tween in tweens {
            let t = tween.progress(self.now);
            if !tween.superseded {
                self.apply(tween.element, tween.track.sample(t));
            }
            if t >= 1.0 {
                finished.push(tween.id);
            } else {
                self.tweens.push(tween);
            }
        }
        finished
    }

    fn apply(&mut self, id: ElementId, sample: Sample) {
        match sample {
            Sample::Path(path) => self.set_path(id, path),
            Sample::Opacity(o) => self.set_opacity(id, o),
            Sample::ImageRect(r) => self.set_image_rect(id, r),
            Sample::TextPosition(p) => self.set_text_position(id, p),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::circle_path;

    fn ms(n: u64) -> Duration {
        Duration::from_millis(n)
    }

    #[test]
    fn test_remove_drops_subtree() {
        let mut scene = Scene::new(100.0, 100.0);
        let group = scene.group(scene.root());
        let shape = scene.path(group, circle_path(Point::new(0.0, 0.0), 1.0));
        scene.remove(group);
        assert!(!scene.contains(group));
        assert!(!scene.contains(shape));
        assert!(scene.get(scene.root()).unwrap().children.is_empty());
    }

    #[test]
    fn test_clip_moves_shape_into_clip_path() {
        let mut scene = Scene::new(100.0, 100.0);
        let group = scene.group(scene.root());
        let shape = scene.path(group, circle_path(Point::new(50.0, 50.0), 10.0));
        let image = scene.image(group, "a.png", Rect::new(40.0, 40.0, 20.0, 20.0));

        let clip = scene.clip(image, shape).unwrap();
        assert_eq!(scene.parent(shape), Some(clip));
        assert!(scene.is_clip_path(clip));
        assert_eq!(scene.clip_shape(image), Some(shape));
        assert_eq!(scene.get(group).unwrap().children, vec![image]);
    }

    #[test]
    fn test_animation_reports_completion_later() {
        let mut scene = Scene::new(100.0, 100.0);
        let group = scene.group(scene.root());
        let anim = scene.animate(group, Target::Opacity(0.0), ms(100));

        assert!(scene.advance(ms(50)).is_empty());
        assert!((scene.get(group).unwrap().opacity - 0.5).abs() < 1e-9);
        assert_eq!(scene.advance(ms(100)), vec![anim]);
        assert_eq!(scene.get(group).unwrap().opacity, 0.0);
        assert!(!scene.is_animating());
    }

    #[test]
    fn test_completion_order_follows_start_order() {
        let mut scene = Scene::new(100.0, 100.0);
        let a = scene.group(scene.root());
        let b = scene.group(scene.root());
        let first = scene.animate(a, Target::Opacity(0.0), ms(10));
        let second = scene.animate(b, Target::Opacity(0.0), ms(10));
        assert_eq!(scene.advance(ms(20)), vec![first, second]);
    }

    #[test]
    fn test_pending_path_reports_end_state() {
        let mut scene = Scene::new(100.0, 100.0);
        let small = circle_path(Point::new(50.0, 50.0), 5.0);
        let large = circle_path(Point::new(50.0, 50.0), 20.0);
        let shape = scene.path(scene.root(), small.clone());
        scene.animate(shape, Target::Path(large.clone()), ms(100));
        scene.advance(ms(10));

        assert_eq!(scene.pending_path(shape), Some(large));
        let bbox = scene.pending_bbox(shape).unwrap();
        assert!((bbox.w - 40.0).abs() < 1e-6);
        assert_ne!(scene.path_of(shape), Some(&small));
    }

    #[test]
    fn test_newer_tween_supersedes_older() {
        let mut scene = Scene::new(100.0, 100.0);
        let g = scene.group(scene.root());
        let old = scene.animate(g, Target::Opacity(0.0), ms(100));
        scene.advance(ms(50));
        let new = scene.animate(g, Target::Opacity(1.0), ms(200));

        assert_eq!(scene.advance(ms(100)), vec![old]);
        assert!(scene.get(g).unwrap().opacity > 0.5);
        assert_eq!(scene.advance(ms(250)), vec![new]);
        assert_eq!(scene.get(g).unwrap().opacity, 1.0);
    }

    #[test]
    fn test_removed_element_still_completes() {
        let mut scene = Scene::new(100.0, 100.0);
        let g = scene.group(scene.root());
        let anim = scene.animate(g, Target::Opacity(0.0), ms(100));
        scene.remove(g);
        assert_eq!(scene.advance(ms(100)), vec![anim]);
    }

    #[test]
    fn test_select_finds_nested_class() {
        let mut scene = Scene::new(100.0, 100.0);
        let outer = scene.group(scene.root());
        let inner = scene.group(outer);
        let text = scene.text(inner, "x", TextPlacement::At(Point::new(1.0, 2.0)));
        scene.add_class(text, "text-icon");
        assert_eq!(scene.select(outer, "text-icon"), Some(text));
        assert_eq!(scene.select(outer, "missing"), None);
    }
}
