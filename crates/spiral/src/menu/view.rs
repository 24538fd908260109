use crate::geometry::{Layout, Path, Point, Rect, circle_path};
use crate::item::{ItemId, MenuItem};
use crate::options::MenuOptions;
use crate::scene::{AttrKind, ElementId, Scene, Stroke, Target, TextPlacement};
use derive_more::{Display, From, Into};
use palette::Srgba;
use std::collections::HashMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Display, From, Into)]
pub struct ViewId(u64);

crate::impl_id_newtype!(ViewId);

const ARROW_WIDTH: f64 = 61.842;
const ARROW_HEIGHT: f64 = 64.0;
const ARROW_STROKE: f64 = 4.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ViewKind {
    /// A pie slice at this position around the ring.
    Slice(usize),
    /// The central disc.
    Root,
}

/// Pointer interaction with a view.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Gesture {
    Click,
    DoubleClick,
    Enter,
    Leave,
}

/// What a view asks the menu to do in response to a gesture, in order.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Reaction {
    RunItemHook,
    Clicked { is_child: bool },
    Promote(ItemId),
    Demote,
    Open(String),
    ShowTitle(String),
    RestoreTitle,
    PauseAutoScroll,
    ResumeAutoScroll,
    RevealParent(bool),
}

/// Tree change forwarded to the view of the changed item.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ItemNote {
    ChildAdded,
    ChildRemoved { was_visible: bool },
}

/// Everything a view needs from its menu while drawing.
pub(crate) struct ViewContext<'a> {
    pub scene: &'a mut Scene,
    pub layout: &'a Layout,
    pub options: &'a MenuOptions,
    pub slice_count: usize,
    pub container: ElementId,
}

/// On-screen representation of one item: a slice or the root disc.
#[derive(Debug)]
pub struct ItemView {
    id: ViewId,
    item: ItemId,
    kind: ViewKind,
    group: ElementId,
    shape: ElementId,
    image: Option<ElementId>,
    text_icon: Option<ElementId>,
    hover_group: Option<ElementId>,
}

impl ItemView {
    pub(crate) fn slice(
        ctx: &mut ViewContext<'_>,
        id: ViewId,
        item: &MenuItem,
        index: usize,
    ) -> Self {
        let scene = &mut *ctx.scene;
        let group = scene.group(ctx.container);
        scene.add_class(group, "slice");
        if item.is_leaf() {
            scene.add_class(group, "leaf");
        }
        scene.set_title(group, item.title.clone());

        let shape = scene.path(group, ctx.layout.slice_path(index, ctx.slice_count));
        scene.set_fill(shape, item.fill);
        let bbox = scene.bbox(shape).unwrap_or_default();

        let image = match &item.background_image {
            Some(url) => {
                let img = scene.image(group, url.clone(), bbox);
                scene.clip(img, shape);
                Some(img)
            }
            None => {
                scene.add_class(shape, "main-shape");
                None
            }
        };

        let text_icon = (item.text_icon.is_some()
            || image.is_none()
            || ctx.options.always_show_text_icon)
            .then(|| {
                let at = ctx.layout.slice_center(index, ctx.slice_count);
                let text = scene.text(group, item.text_icon_text(), TextPlacement::At(at));
                scene.add_class(text, "text-icon");
                text
            });

        Self {
            id,
            item: item.id(),
            kind: ViewKind::Slice(index),
            group,
            shape,
            image,
            text_icon,
            hover_group: None,
        }
    }

    /// Central disc. `parent_title` is set when the item can be demoted and
    /// adds the "go up" affordance shown on hover.
    pub(crate) fn root(
        ctx: &mut ViewContext<'_>,
        id: ViewId,
        item: &MenuItem,
        parent_title: Option<&str>,
    ) -> Self {
        let layout = ctx.layout;
        let duration = ctx.options.animation_duration();
        let scene = &mut *ctx.scene;

        let group = scene.group(ctx.container);
        scene.add_class(group, "root");
        scene.set_title(group, item.title.clone());

        let shape = scene.path(group, layout.inner_circle_path());
        scene.set_fill(shape, item.fill);

        let shadow = scene.path(group, layout.inner_circle_path());
        scene.add_class(shadow, "shadow-circle");

        let hover_group = parent_title.map(|title| {
            scene.add_class(group, "has-parent");
            let hover = scene.group(group);
            scene.add_class(hover, "hover-group");
            scene.set_visible(hover, false);

            let circle = scene.path(hover, layout.inner_circle_path());
            scene.add_class(circle, "hover-circle");

            let arrow = scene.path(hover, up_arrow());
            scene.add_class(arrow, "up-arrow");
            scene.set_stroke(
                arrow,
                Some(Stroke {
                    color: Srgba::new(0.976, 0.976, 0.976, 0.75),
                    width: ARROW_STROKE,
                }),
            );
            scene.set_offset(
                arrow,
                Point::new(
                    layout.center.x - ARROW_WIDTH / 2.0,
                    layout.center.y - ARROW_HEIGHT - layout.inner_radius * 0.25,
                ),
            );

            let at = Point::new(layout.center.x, layout.center.y + layout.inner_radius * 0.2);
            let text = scene.text(hover, title, TextPlacement::At(at));
            scene.add_class(text, "root-title");
            hover
        });

        let diameter = layout.inner_radius * 2.0;
        let image = match &item.background_image {
            Some(url) => {
                let top_left = Point::new(
                    layout.center.x - layout.inner_radius,
                    layout.center.y - layout.inner_radius,
                );
                let full = Rect::new(top_left.x, top_left.y, diameter, diameter);
                let img = scene.image(group, url.clone(), full);
                scene.clip(img, shape);
                if ctx.options.animate {
                    scene.set_image_rect(img, Rect::new(top_left.x, top_left.y, 0.0, 0.0));
                    scene.animate(img, Target::ImageRect(full), duration);
                }
                Some(img)
            }
            None => {
                scene.add_class(shape, "main-shape");
                None
            }
        };

        if ctx.options.animate {
            scene.set_path(shape, circle_path(layout.center, 0.0));
            scene.animate(shape, Target::Path(layout.inner_circle_path()), duration);
        }

        Self {
            id,
            item: item.id(),
            kind: ViewKind::Root,
            group,
            shape,
            image,
            text_icon: None,
            hover_group,
        }
    }

    pub fn id(&self) -> ViewId {
        self.id
    }

    pub fn item(&self) -> ItemId {
        self.item
    }

    pub fn kind(&self) -> ViewKind {
        self.kind
    }

    pub fn index(&self) -> Option<usize> {
        match self.kind {
            ViewKind::Slice(i) => Some(i),
            ViewKind::Root => None,
        }
    }

    pub(crate) fn set_index(&mut self, index: usize) {
        if let ViewKind::Slice(i) = &mut self.kind {
            *i = index;
        }
    }

    pub fn group(&self) -> ElementId {
        self.group
    }

    pub fn shape(&self) -> ElementId {
        self.shape
    }

    pub fn image(&self) -> Option<ElementId> {
        self.image
    }

    pub fn text_icon(&self) -> Option<ElementId> {
        self.text_icon
    }

    pub fn hover_group(&self) -> Option<ElementId> {
        self.hover_group
    }

    /// Brings image and text icon in line with the item and with where the
    /// shape is heading if it is mid-animation.
    pub(crate) fn update(&mut self, ctx: &mut ViewContext<'_>, item: &MenuItem) {
        let scene = &mut *ctx.scene;

        if let Some(url) = &item.background_image {
            let bbox = scene.pending_bbox(self.shape).unwrap_or_default().round();
            match self.image {
                Some(img) => {
                    scene.set_image_href(img, url.clone());
                    match scene.timing(self.shape, AttrKind::Path) {
                        Some((start, duration)) => {
                            scene.animate_from(img, Target::ImageRect(bbox), start, duration);
                        }
                        None => scene.set_image_rect(img, bbox),
                    }
                }
                None => {
                    let img = scene.image(self.group, url.clone(), bbox);
                    scene.clip(img, self.shape);
                    self.image = Some(img);
                }
            }
        }

        let always = ctx.options.always_show_text_icon;
        if !always && self.image.is_some() && item.text_icon.is_none()
            && let Some(text) = self.text_icon.take()
        {
            scene.remove(text);
        }

        if always && let Some(text) = self.text_icon {
            scene.append(self.group, text);
        }

        let ViewKind::Slice(index) = self.kind else {
            return;
        };
        if (always || item.text_icon.is_some() || self.image.is_none())
            && let Some(text) = self.text_icon
        {
            let at = ctx.layout.slice_center(index, ctx.slice_count);
            scene.animate(
                text,
                Target::TextPosition(at),
                ctx.options.animation_duration(),
            );
            if let Some(img) = self.image {
                scene.insert_after(img, text);
            }
        }
    }

    /// Whether a change to the item's children requires a full redraw.
    pub(crate) fn needs_redraw(
        &self,
        note: ItemNote,
        slice_count: usize,
        max_slices: usize,
    ) -> bool {
        match note {
            ItemNote::ChildAdded => slice_count < max_slices,
            ItemNote::ChildRemoved { was_visible } => was_visible,
        }
    }

    pub(crate) fn react(
        &self,
        gesture: Gesture,
        item: &MenuItem,
        has_parent: bool,
    ) -> Vec<Reaction> {
        match (self.kind, gesture) {
            (_, Gesture::DoubleClick) => {
                item.href.clone().map(Reaction::Open).into_iter().collect()
            }
            (ViewKind::Slice(_), Gesture::Click) => {
                let mut reactions = vec![
                    Reaction::RunItemHook,
                    Reaction::Clicked { is_child: true },
                ];
                if !item.is_leaf() {
                    reactions.push(Reaction::Promote(item.id()));
                }
                reactions
            }
            (ViewKind::Root, Gesture::Click) => {
                let mut reactions = vec![
                    Reaction::RunItemHook,
                    Reaction::Clicked { is_child: false },
                ];
                if has_parent {
                    reactions.push(Reaction::Demote);
                }
                reactions
            }
            (ViewKind::Slice(_), Gesture::Enter) => {
                vec![Reaction::ShowTitle(item.title.clone()), Reaction::PauseAutoScroll]
            }
            (ViewKind::Slice(_), Gesture::Leave) => {
                vec![Reaction::RestoreTitle, Reaction::ResumeAutoScroll]
            }
            (ViewKind::Root, Gesture::Enter) => vec![Reaction::RevealParent(true)],
            (ViewKind::Root, Gesture::Leave) => vec![Reaction::RevealParent(false)],
        }
    }

    /// Takes the view off the surface, including a clip path synthesized for
    /// its background image.
    pub(crate) fn destroy(self, scene: &mut Scene) {
        match scene.parent(self.shape) {
            Some(parent) if scene.is_clip_path(parent) => scene.remove(parent),
            _ => scene.remove(self.shape),
        }
        scene.remove(self.group);
    }
}

/// "Go up" arrow in its own 62x64 box; placed with a shape offset.
fn up_arrow() -> Path {
    Path::new()
        .move_to(Point::new(31.0, 2.0))
        .line_to(Point::new(31.0, 62.0))
        .move_to(Point::new(2.0, 31.0))
        .line_to(Point::new(31.0, 2.0))
        .line_to(Point::new(59.75, 31.0))
}

/// Live views, with a lookup from item to the view currently showing it.
#[derive(Debug, Default)]
pub(crate) struct ViewArena {
    views: HashMap<ViewId, ItemView>,
    by_item: HashMap<ItemId, ViewId>,
    next_id: u64,
}

impl ViewArena {
    pub fn allocate(&mut self) -> ViewId {
        let id = ViewId::new(self.next_id);
        self.next_id += 1;
        id
    }

    pub fn insert(&mut self, view: ItemView) {
        self.by_item.insert(view.item, view.id);
        self.views.insert(view.id, view);
    }

    pub fn get(&self, id: ViewId) -> Option<&ItemView> {
        self.views.get(&id)
    }

    pub fn get_mut(&mut self, id: ViewId) -> Option<&mut ItemView> {
        self.views.get_mut(&id)
    }

    pub fn of_item(&self, item: ItemId) -> Option<ViewId> {
        self.by_item.get(&item).copied()
    }

    /// Drops the view; the item's back-reference is cleared only if it
    /// still points at this view.
    pub fn take(&mut self, id: ViewId) -> Option<ItemView> {
        let view = self.views.remove(&id)?;
        if self.by_item.get(&view.item) == Some(&id) {
            self.by_item.remove(&view.item);
        }
        Some(view)
    }

    pub fn len(&self) -> usize {
        self.views.len()
    }
}
