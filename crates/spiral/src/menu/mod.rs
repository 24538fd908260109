//! The navigation controller.
//!
//! A [`Menu`] owns the item tree, the navigation trail from the source root
//! to the current root, the page window and every live [`ItemView`]. Paging
//! commits its state at once and lets the scene animate behind it; promotion
//! and demotion commit when their animation completes, which the host drives
//! through [`Menu::tick`].

mod view;

pub use view::{Gesture, ItemView, ViewId, ViewKind};

use crate::color::FillGenerator;
use crate::error::MenuError;
use crate::events::{ListenerId, Listeners, PageBounds, Signal};
use crate::geometry::{Edge, Hit, Layout, Point};
use crate::item::{ItemId, MenuItem};
use crate::options::MenuOptions;
use crate::scene::{AnimationId, ElementId, Scene, Target, TextPlacement};
use std::collections::HashMap;
use std::time::Duration;
use view::{ItemNote, Reaction, ViewArena, ViewContext};

/// Window in which a second click turns into a double click.
pub const DOUBLE_CLICK_WINDOW: Duration = Duration::from_millis(300);

pub type ClickHandler = Box<dyn FnMut(bool, &MenuItem)>;

/// One level of the way down from the source root. Remembers the parent's
/// page window so demotion lands exactly where promotion started.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Frame {
    item: ItemId,
    parent_page_start: usize,
    parent_slice_count: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Transition {
    Promoting,
    Demoting,
}

/// Work left for when an animation completes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Finish {
    Destroy(ViewId),
    Promoted { view: ViewId, item: ItemId },
    Demoted { view: ViewId, item: ItemId },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Step {
    Moved(ViewId),
    AtEnd,
    Busy,
}

#[derive(Debug, Clone, Copy)]
struct Surface {
    spiral: ElementId,
    title: ElementId,
}

#[derive(Debug, Clone, Copy)]
struct AutoScroll {
    interval: Duration,
    next_due: Duration,
}

#[derive(Debug, Clone, Copy)]
struct PendingClick {
    view: ViewId,
    deadline: Duration,
}

/// Split borrows of the menu used while building or moving views.
struct Parts<'a> {
    ctx: ViewContext<'a>,
    views: &'a mut ViewArena,
    current: &'a MenuItem,
    parent: Option<&'a MenuItem>,
}

/// Follows the trail from `root`; returns the current root and its parent.
fn resolve<'a>(root: &'a MenuItem, trail: &[Frame]) -> (&'a MenuItem, Option<&'a MenuItem>) {
    let mut parent = None;
    let mut node = root;
    for frame in trail {
        match node.child(frame.item) {
            Some(child) => {
                parent = Some(node);
                node = child;
            }
            None => break,
        }
    }
    (node, parent)
}

fn shift_slice(
    ctx: &mut ViewContext<'_>,
    views: &mut ViewArena,
    current: &MenuItem,
    id: ViewId,
    index: usize,
) {
    let Some(view) = views.get_mut(id) else {
        return;
    };
    let Some(item) = current.child(view.item()) else {
        return;
    };
    ctx.scene.animate(
        view.shape(),
        Target::Path(ctx.layout.slice_path(index, ctx.slice_count)),
        ctx.options.animation_duration(),
    );
    view.set_index(index);
    view.update(ctx, item);
}

pub struct Menu {
    options: MenuOptions,
    layout: Layout,
    source_root: MenuItem,
    trail: Vec<Frame>,
    page_start: usize,
    slice_count: usize,
    slices: Vec<ViewId>,
    root_view: Option<ViewId>,
    views: ViewArena,
    scene: Scene,
    surface: Option<Surface>,
    completions: HashMap<AnimationId, Finish>,
    transition: Option<Transition>,
    listeners: Listeners,
    on_click: Option<ClickHandler>,
    fills: FillGenerator,
    autoscroll: Option<AutoScroll>,
    clock: Duration,
    pending_click: Option<PendingClick>,
    hovered: Option<ViewId>,
}

impl Menu {
    pub fn new(root: MenuItem, options: MenuOptions) -> Result<Self, MenuError> {
        Self::with_fills(root, options, FillGenerator::new())
    }

    /// Like [`Menu::new`] with an explicit color source, e.g. a seeded one.
    pub fn with_fills(
        mut root: MenuItem,
        options: MenuOptions,
        mut fills: FillGenerator,
    ) -> Result<Self, MenuError> {
        options.validate()?;
        paint(&mut root, &mut fills);

        let layout = Layout::new(options.size);
        let slice_count = options.max_slices.min(root.children().len());
        let mut menu = Self {
            page_start: options.page_start,
            slice_count,
            layout,
            scene: Scene::new(layout.canvas_width, layout.canvas_height),
            options,
            source_root: root,
            trail: Vec::new(),
            slices: Vec::new(),
            root_view: None,
            views: ViewArena::default(),
            surface: None,
            completions: HashMap::new(),
            transition: None,
            listeners: Listeners::default(),
            on_click: None,
            fills,
            autoscroll: None,
            clock: Duration::ZERO,
            pending_click: None,
            hovered: None,
        };
        menu.validate_page_start();
        Ok(menu)
    }

    /// Called on every slice or root click, after the item's own hook and
    /// before any navigation.
    pub fn set_click_handler(&mut self, handler: impl FnMut(bool, &MenuItem) + 'static) {
        self.on_click = Some(Box::new(handler));
    }

    pub fn options(&self) -> &MenuOptions {
        &self.options
    }

    pub fn layout(&self) -> &Layout {
        &self.layout
    }

    pub fn scene(&self) -> &Scene {
        &self.scene
    }

    pub fn source_root(&self) -> &MenuItem {
        &self.source_root
    }

    pub fn current_root(&self) -> &MenuItem {
        resolve(&self.source_root, &self.trail).0
    }

    /// Parent of the current root, if it can be demoted.
    pub fn current_parent(&self) -> Option<&MenuItem> {
        resolve(&self.source_root, &self.trail).1
    }

    pub fn item(&self, id: ItemId) -> Option<&MenuItem> {
        self.source_root.find(id)
    }

    pub fn page_start(&self) -> usize {
        self.page_start
    }

    pub fn slice_count(&self) -> usize {
        self.slice_count
    }

    pub fn page_bounds(&self) -> PageBounds {
        PageBounds::new(self.page_start, self.slice_count)
    }

    /// Live slice views in on-screen order.
    pub fn slices(&self) -> &[ViewId] {
        &self.slices
    }

    pub fn root_view(&self) -> Option<ViewId> {
        self.root_view
    }

    pub fn view(&self, id: ViewId) -> Option<&ItemView> {
        self.views.get(id)
    }

    /// The view currently showing `item`, including one still animating out.
    pub fn view_of(&self, item: ItemId) -> Option<&ItemView> {
        self.views.of_item(item).and_then(|id| self.views.get(id))
    }

    /// Items behind the live slices, in on-screen order.
    pub fn visible_items(&self) -> Vec<ItemId> {
        self.slices
            .iter()
            .filter_map(|id| self.views.get(*id))
            .map(ItemView::item)
            .collect()
    }

    /// Number of views alive on the surface, including outgoing ones.
    pub fn view_count(&self) -> usize {
        self.views.len()
    }

    /// A promotion or demotion is waiting for its animation.
    pub fn is_busy(&self) -> bool {
        self.transition.is_some()
    }

    pub fn is_animating(&self) -> bool {
        self.scene.is_animating()
    }

    pub fn is_auto_scrolling(&self) -> bool {
        self.autoscroll.is_some()
    }

    pub fn title_element(&self) -> Option<ElementId> {
        self.surface.map(|s| s.title)
    }

    pub fn spiral_element(&self) -> Option<ElementId> {
        self.surface.map(|s| s.spiral)
    }

    /// Text currently shown along the top of the ring.
    pub fn title_text(&self) -> Option<&str> {
        let title = self.surface?.title;
        match &self.scene.get(title)?.kind {
            crate::scene::ElementKind::Text { content, .. } => Some(content),
            _ => None,
        }
    }

    pub fn on(
        &mut self,
        event: &str,
        callback: impl FnMut(&Signal) + 'static,
    ) -> Result<ListenerId, MenuError> {
        self.listeners.on(event, Box::new(callback))
    }

    pub fn off(&mut self, event: &str, id: ListenerId) -> Result<(), MenuError> {
        self.listeners.off(event, id)
    }

    fn emit_scroll(&mut self) {
        let bounds = self.page_bounds();
        self.listeners.trigger(&Signal::Scroll(bounds));
    }

    /// Clamps the page start so the window fits in the current root's
    /// children. Idempotent.
    pub fn validate_page_start(&mut self) {
        let len = self.current_root().children().len();
        if (self.slice_count < self.options.max_slices && self.page_start > 0)
            || self.page_start + self.slice_count > len
        {
            self.page_start = len.saturating_sub(self.slice_count);
        }
    }

    fn ensure_surface(&mut self) -> Surface {
        if let Some(surface) = self.surface {
            return surface;
        }
        let root = self.scene.root();
        let spiral = self.scene.group(root);
        self.scene.add_class(spiral, "spiral");
        let title = self.scene.text(
            root,
            "",
            TextPlacement::OnPath {
                path: self.layout.outer_circle_path(),
                offset: 0.5,
                dy: -2.0,
            },
        );
        self.scene.add_class(title, "title");
        let surface = Surface { spiral, title };
        self.surface = Some(surface);
        surface
    }

    fn parts(&mut self) -> Parts<'_> {
        let container = self.surface.map_or(self.scene.root(), |s| s.spiral);
        let (current, parent) = resolve(&self.source_root, &self.trail);
        Parts {
            ctx: ViewContext {
                scene: &mut self.scene,
                layout: &self.layout,
                options: &self.options,
                slice_count: self.slice_count,
                container,
            },
            views: &mut self.views,
            current,
            parent,
        }
    }

    /// Builds views for the current page and the root. Expects the previous
    /// views to be gone already; see [`Menu::redraw`].
    pub fn draw(&mut self) {
        self.slice_count = self
            .options
            .max_slices
            .min(self.current_root().children().len());
        self.validate_page_start();
        let surface = self.ensure_surface();
        let page_start = self.page_start;
        let slice_count = self.slice_count;

        let Parts {
            mut ctx,
            views,
            current,
            parent,
        } = self.parts();
        let mut slices = Vec::with_capacity(slice_count);
        for (index, child) in current.children()[page_start..page_start + slice_count]
            .iter()
            .enumerate()
        {
            let id = views.allocate();
            views.insert(ItemView::slice(&mut ctx, id, child, index));
            slices.push(id);
        }
        let root_id = views.allocate();
        views.insert(ItemView::root(
            &mut ctx,
            root_id,
            current,
            parent.map(|p| p.title.as_str()),
        ));
        let title = current.title.clone();

        self.slices = slices;
        self.root_view = Some(root_id);
        self.scene.set_text(surface.title, title);
        log::debug!(
            "drew {} slices from {} of {}",
            slice_count,
            page_start,
            self.current_root().children().len()
        );
        self.emit_scroll();

        if self.options.auto_scroll {
            self.start_auto_scroll(None);
        }
    }

    fn teardown(&mut self) {
        for id in self.slices.drain(..).chain(self.root_view.take()) {
            if let Some(view) = self.views.take(id) {
                view.destroy(&mut self.scene);
            }
        }
    }

    /// Destroys the root and slice views and draws again.
    pub fn redraw(&mut self) {
        self.teardown();
        self.draw();
    }

    /// Pages forward by one child. Returns the new slice's view, or `None`
    /// when the last child is already shown or a transition is pending.
    pub fn next(&mut self) -> Option<ViewId> {
        match self.step_next() {
            Step::Moved(id) => Some(id),
            Step::AtEnd | Step::Busy => None,
        }
    }

    /// Pages back by one child; the mirror of [`Menu::next`].
    pub fn previous(&mut self) -> Option<ViewId> {
        match self.step_previous() {
            Step::Moved(id) => Some(id),
            Step::AtEnd | Step::Busy => None,
        }
    }

    fn can_page(&self) -> bool {
        if self.transition.is_some() {
            log::debug!("paging ignored while {:?}", self.transition);
            return false;
        }
        if self.surface.is_none() || self.slices.len() != self.slice_count {
            log::debug!("paging ignored before the menu is drawn");
            return false;
        }
        true
    }

    fn step_next(&mut self) -> Step {
        let incoming = self.page_start + self.slice_count;
        if incoming >= self.current_root().children().len() {
            return Step::AtEnd;
        }
        if !self.can_page() {
            return Step::Busy;
        }

        let duration = self.options.animation_duration();
        let last = self.slice_count - 1;
        let mut slices = std::mem::take(&mut self.slices);
        let outgoing = slices.remove(0);
        let mut pending = Vec::new();

        let Parts {
            mut ctx,
            views,
            current,
            ..
        } = self.parts();
        let layout = ctx.layout;
        let count = ctx.slice_count;

        if let Some(view) = views.get(outgoing) {
            let anim = ctx.scene.animate(
                view.shape(),
                Target::Path(layout.empty_slice_path(0, count, Edge::Start)),
                duration,
            );
            pending.push((anim, Finish::Destroy(outgoing)));
        }

        let id = views.allocate();
        let view = ItemView::slice(&mut ctx, id, &current.children()[incoming], last);
        ctx.scene
            .set_path(view.shape(), layout.empty_slice_path(last, count, Edge::End));
        ctx.scene.set_opacity(view.group(), 0.0);
        ctx.scene
            .animate(view.shape(), Target::Path(layout.slice_path(last, count)), duration);
        ctx.scene.animate(view.group(), Target::Opacity(1.0), duration);
        views.insert(view);

        for (index, &slice) in slices.iter().enumerate() {
            shift_slice(&mut ctx, views, current, slice, index);
        }
        slices.push(id);

        self.slices = slices;
        self.completions.extend(pending);
        self.page_start += 1;
        self.emit_scroll();
        Step::Moved(id)
    }

    fn step_previous(&mut self) -> Step {
        if self.page_start == 0 {
            return Step::AtEnd;
        }
        if !self.can_page() {
            return Step::Busy;
        }

        let incoming = self.page_start - 1;
        let duration = self.options.animation_duration();
        let last = self.slice_count - 1;
        let mut slices = std::mem::take(&mut self.slices);
        let outgoing = slices.pop();
        let mut pending = Vec::new();

        let Parts {
            mut ctx,
            views,
            current,
            ..
        } = self.parts();
        let layout = ctx.layout;
        let count = ctx.slice_count;

        if let Some(outgoing) = outgoing
            && let Some(view) = views.get(outgoing)
        {
            let anim = ctx.scene.animate(
                view.shape(),
                Target::Path(layout.empty_slice_path(last, count, Edge::End)),
                duration,
            );
            pending.push((anim, Finish::Destroy(outgoing)));
        }

        let id = views.allocate();
        let view = ItemView::slice(&mut ctx, id, &current.children()[incoming], 0);
        ctx.scene
            .set_path(view.shape(), layout.empty_slice_path(0, count, Edge::Start));
        ctx.scene.set_opacity(view.group(), 0.0);
        ctx.scene
            .animate(view.shape(), Target::Path(layout.slice_path(0, count)), duration);
        ctx.scene.animate(view.group(), Target::Opacity(1.0), duration);
        views.insert(view);

        for (index, &slice) in slices.iter().enumerate() {
            shift_slice(&mut ctx, views, current, slice, index + 1);
        }
        slices.insert(0, id);

        self.slices = slices;
        self.completions.extend(pending);
        self.page_start -= 1;
        self.emit_scroll();
        Step::Moved(id)
    }

    /// Moves a visible child of the current root to the center. The commit
    /// happens when the animation completes. Returns `false` if another
    /// transition is still pending.
    pub fn promote_child(&mut self, item: ItemId) -> Result<bool, MenuError> {
        if self.transition.is_some() {
            log::debug!("promotion of {item} ignored while {:?}", self.transition);
            return Ok(false);
        }
        let current = self.current_root();
        if current.index_of(item).is_none() {
            return Err(MenuError::NotAChild {
                parent: current.id(),
                child: item,
            });
        }
        let survivor = self
            .slices
            .iter()
            .copied()
            .find(|id| self.views.get(*id).is_some_and(|v| v.item() == item))
            .ok_or(MenuError::NotVisible(item))?;

        let doomed = self
            .root_view
            .take()
            .into_iter()
            .chain(self.slices.drain(..).filter(|id| *id != survivor));
        for id in doomed.collect::<Vec<_>>() {
            if let Some(view) = self.views.take(id) {
                view.destroy(&mut self.scene);
            }
        }

        self.trail.push(Frame {
            item,
            parent_page_start: self.page_start,
            parent_slice_count: self.slice_count,
        });
        self.slice_count = self
            .options
            .max_slices
            .min(self.current_root().children().len());

        let duration = self.options.animation_duration();
        let Parts {
            mut ctx,
            views,
            current,
            ..
        } = self.parts();
        let anim = views.get_mut(survivor).map(|view| {
            let anim = ctx.scene.animate(
                view.shape(),
                Target::Path(ctx.layout.inner_circle_path()),
                duration,
            );
            view.update(&mut ctx, current);
            anim
        });

        if let Some(anim) = anim {
            self.completions.insert(
                anim,
                Finish::Promoted {
                    view: survivor,
                    item,
                },
            );
        }
        self.transition = Some(Transition::Promoting);
        log::debug!("promoting {item}");
        Ok(true)
    }

    /// Returns the current root to its parent's ring. Returns `false` if
    /// another transition is still pending.
    pub fn demote_root(&mut self) -> Result<bool, MenuError> {
        if self.transition.is_some() {
            log::debug!("demotion ignored while {:?}", self.transition);
            return Ok(false);
        }
        let frame = *self.trail.last().ok_or(MenuError::AtTopLevel)?;
        let Some(root_view) = self.root_view else {
            log::debug!("demotion ignored before the menu is drawn");
            return Ok(false);
        };

        for id in std::mem::take(&mut self.slices) {
            if let Some(view) = self.views.take(id) {
                view.destroy(&mut self.scene);
            }
        }

        let parent = resolve(&self.source_root, &self.trail[..self.trail.len() - 1]).0;
        let absolute = parent.index_of(frame.item).unwrap_or(frame.parent_page_start);
        self.slice_count = frame.parent_slice_count.max(1);
        let relative = absolute
            .saturating_sub(frame.parent_page_start)
            .min(self.slice_count - 1);

        let duration = self.options.animation_duration();
        let Parts {
            mut ctx,
            views,
            current,
            ..
        } = self.parts();
        let anim = views.get_mut(root_view).map(|view| {
            let anim = ctx.scene.animate(
                view.shape(),
                Target::Path(ctx.layout.slice_path(relative, ctx.slice_count)),
                duration,
            );
            view.update(&mut ctx, current);
            anim
        });

        self.root_view = None;
        if let Some(anim) = anim {
            self.completions.insert(
                anim,
                Finish::Demoted {
                    view: root_view,
                    item: frame.item,
                },
            );
        }
        self.transition = Some(Transition::Demoting);
        log::debug!("demoting {} into slot {relative}", frame.item);
        Ok(true)
    }

    fn finish(&mut self, finish: Finish) {
        match finish {
            Finish::Destroy(id) => {
                if let Some(view) = self.views.take(id) {
                    view.destroy(&mut self.scene);
                }
            }
            Finish::Promoted { view, item } => {
                if let Some(view) = self.views.take(view) {
                    view.destroy(&mut self.scene);
                }
                if self.trail.last().is_none_or(|f| f.item != item) {
                    log::debug!("promotion of {item} outlived its trail entry");
                    return;
                }
                self.transition = None;
                self.page_start = 0;
                self.emit_scroll();
                self.redraw();

                let root = self.current_root();
                if let Some(hook) = root.becoming_root_hook() {
                    hook(root);
                }
            }
            Finish::Demoted { view, item } => {
                if let Some(view) = self.views.take(view) {
                    view.destroy(&mut self.scene);
                }
                self.transition = None;
                if let Some(frame) = self.trail.last().copied()
                    && frame.item == item
                {
                    self.page_start = frame.parent_page_start;
                    self.trail.pop();
                }
                self.emit_scroll();
                self.redraw();
            }
        }
    }

    /// Arms the autoscroll timer; a no-op if it is already running.
    pub fn start_auto_scroll(&mut self, interval: Option<Duration>) {
        if self.autoscroll.is_some() {
            return;
        }
        let interval = interval
            .filter(|i| !i.is_zero())
            .unwrap_or_else(|| self.options.auto_scroll_interval());
        self.autoscroll = Some(AutoScroll {
            interval,
            next_due: self.clock + interval,
        });
    }

    pub fn stop_auto_scroll(&mut self) {
        self.autoscroll = None;
    }

    /// Adds `child` under `parent`. Redraws when the parent is on screen
    /// and the page still has room.
    pub fn add_child(&mut self, parent: ItemId, mut child: MenuItem) -> Result<(), MenuError> {
        paint(&mut child, &mut self.fills);
        self.source_root
            .find_mut(parent)
            .ok_or(MenuError::UnknownItem(parent))?
            .add_child(child);
        self.notify(parent, ItemNote::ChildAdded);
        Ok(())
    }

    pub fn add_children(
        &mut self,
        parent: ItemId,
        children: impl IntoIterator<Item = MenuItem>,
    ) -> Result<(), MenuError> {
        for child in children {
            self.add_child(parent, child)?;
        }
        Ok(())
    }

    /// Detaches a direct child of `parent` and hands it back. Navigation
    /// below a removed item falls back to its parent.
    pub fn remove_child(&mut self, parent: ItemId, child: ItemId) -> Result<MenuItem, MenuError> {
        let was_visible = self.live_view(child).is_some_and(|v| v.index().is_some());
        let before_window = self.current_root().id() == parent
            && self
                .current_root()
                .index_of(child)
                .is_some_and(|i| i < self.page_start);
        let removed = self
            .source_root
            .find_mut(parent)
            .ok_or(MenuError::UnknownItem(parent))?
            .remove_child(child)?;

        if let Some(depth) = self.trail.iter().position(|f| f.item == child) {
            log::debug!("current root left the tree; returning to depth {depth}");
            self.page_start = self.trail[depth].parent_page_start;
            self.trail.truncate(depth);
            self.drop_transition();
            self.redraw();
            return Ok(removed);
        }

        if before_window {
            self.page_start -= 1;
            self.emit_scroll();
        }
        self.notify(parent, ItemNote::ChildRemoved { was_visible });
        Ok(removed)
    }

    /// Forgets a pending promotion or demotion and removes its view.
    fn drop_transition(&mut self) {
        self.transition = None;
        let stale: Vec<AnimationId> = self
            .completions
            .iter()
            .filter(|(_, finish)| !matches!(finish, Finish::Destroy(_)))
            .map(|(anim, _)| *anim)
            .collect();
        for anim in stale {
            if let Some(Finish::Promoted { view, .. } | Finish::Demoted { view, .. }) =
                self.completions.remove(&anim)
                && let Some(view) = self.views.take(view)
            {
                view.destroy(&mut self.scene);
            }
        }
    }

    fn live_view(&self, item: ItemId) -> Option<&ItemView> {
        let id = self.views.of_item(item)?;
        let live = self.root_view == Some(id) || self.slices.contains(&id);
        live.then(|| self.views.get(id)).flatten()
    }

    fn notify(&mut self, item: ItemId, note: ItemNote) {
        let redraw = self
            .live_view(item)
            .is_some_and(|v| v.needs_redraw(note, self.slice_count, self.options.max_slices));
        if !redraw {
            return;
        }
        if self.transition.is_some() {
            log::debug!("{note:?} on {item}: left to the pending transition");
            return;
        }
        self.redraw();
    }

    /// Sets an item's background image and refreshes its view if shown.
    /// Returns whether a view was updated.
    pub fn set_background_image(
        &mut self,
        item: ItemId,
        url: impl Into<String>,
    ) -> Result<bool, MenuError> {
        self.source_root
            .find_mut(item)
            .ok_or(MenuError::UnknownItem(item))?
            .set_background_image(url);

        let Some(id) = self.live_view(item).map(ItemView::id) else {
            return Ok(false);
        };
        let Parts {
            mut ctx,
            views,
            current,
            ..
        } = self.parts();
        let target = if current.id() == item {
            Some(current)
        } else {
            current.child(item)
        };
        match (views.get_mut(id), target) {
            (Some(view), Some(target)) => {
                view.update(&mut ctx, target);
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    /// Advances the clock: runs tweens and their completions, fires a
    /// debounced single click and the autoscroll timer. Returns whether the
    /// scene may have changed.
    pub fn tick(&mut self, now: Duration) -> bool {
        self.clock = self.clock.max(now);
        let mut changed = self.scene.is_animating();

        for anim in self.scene.advance(self.clock) {
            if let Some(finish) = self.completions.remove(&anim) {
                self.finish(finish);
                changed = true;
            }
        }

        if let Some(click) = self.pending_click
            && click.deadline <= self.clock
        {
            self.pending_click = None;
            self.gesture(click.view, Gesture::Click);
            changed = true;
        }

        if let Some(auto) = &mut self.autoscroll
            && auto.next_due <= self.clock
        {
            auto.next_due = self.clock + auto.interval;
            if self.step_next() == Step::AtEnd {
                log::debug!("autoscroll reached the last child");
                self.stop_auto_scroll();
            }
            changed = true;
        }
        changed
    }

    /// Runs every pending animation to its end.
    pub fn settle(&mut self) {
        while let Some(end) = self.scene.settled_at() {
            self.tick(end);
        }
    }

    pub fn now(&self) -> Duration {
        self.clock
    }

    fn view_at(&self, point: Point) -> Option<ViewId> {
        match self.layout.hit(point, self.slice_count)? {
            Hit::Root => self.root_view,
            Hit::Slice(index) => self.slices.get(index).copied(),
        }
    }

    /// A click at `point`. Single clicks fire after [`DOUBLE_CLICK_WINDOW`]
    /// unless a second click on the same view turns them into a double click.
    pub fn click_at(&mut self, point: Point) {
        if let Some(pending) = self.pending_click.take() {
            if self.view_at(point) == Some(pending.view) && self.clock < pending.deadline {
                self.gesture(pending.view, Gesture::DoubleClick);
                return;
            }
            self.gesture(pending.view, Gesture::Click);
        }
        if let Some(view) = self.view_at(point) {
            self.pending_click = Some(PendingClick {
                view,
                deadline: self.clock + DOUBLE_CLICK_WINDOW,
            });
        }
    }

    /// Clicks the view showing `item` at once, without debouncing.
    pub fn click_item(&mut self, item: ItemId) -> Result<(), MenuError> {
        let id = self
            .live_view(item)
            .map(ItemView::id)
            .ok_or(MenuError::NotVisible(item))?;
        self.gesture(id, Gesture::Click);
        Ok(())
    }

    pub fn double_click_item(&mut self, item: ItemId) -> Result<(), MenuError> {
        let id = self
            .live_view(item)
            .map(ItemView::id)
            .ok_or(MenuError::NotVisible(item))?;
        self.gesture(id, Gesture::DoubleClick);
        Ok(())
    }

    pub fn hover_at(&mut self, point: Point) {
        let target = self.view_at(point);
        if target == self.hovered {
            return;
        }
        if let Some(old) = self.hovered.take() {
            self.leave(old);
        }
        if let Some(new) = target {
            self.gesture(new, Gesture::Enter);
        }
        self.hovered = target;
    }

    pub fn pointer_left(&mut self) {
        if let Some(old) = self.hovered.take() {
            self.leave(old);
        }
    }

    pub fn touch_start(&mut self, point: Point) {
        self.hover_at(point);
    }

    pub fn touch_end(&mut self) {
        self.pointer_left();
    }

    fn leave(&mut self, view: ViewId) {
        if self.is_live(view) {
            self.gesture(view, Gesture::Leave);
        } else {
            self.apply(view, None, Reaction::RestoreTitle);
            self.apply(view, None, Reaction::ResumeAutoScroll);
        }
    }

    fn is_live(&self, id: ViewId) -> bool {
        self.root_view == Some(id) || self.slices.contains(&id)
    }

    fn gesture(&mut self, id: ViewId, gesture: Gesture) {
        if !self.is_live(id) {
            return;
        }
        let Some(view) = self.views.get(id) else {
            return;
        };
        let (current, parent) = resolve(&self.source_root, &self.trail);
        let item = match view.kind() {
            ViewKind::Root => Some(current),
            ViewKind::Slice(_) => current.child(view.item()),
        };
        let Some(item) = item else {
            return;
        };
        let item_id = item.id();
        let reactions = view.react(gesture, item, parent.is_some());

        let mut clicked = None;
        for reaction in reactions {
            if let Reaction::Clicked { is_child } = reaction {
                clicked = Some(is_child);
            }
            self.apply(id, Some(item_id), reaction);
        }
        if let Some(is_child) = clicked {
            self.listeners.trigger(&Signal::Click {
                is_child,
                item: item_id,
            });
        }
    }

    fn apply(&mut self, view: ViewId, item: Option<ItemId>, reaction: Reaction) {
        let item = item.and_then(|id| self.source_root.find(id));
        match reaction {
            Reaction::RunItemHook => {
                if let Some(item) = item
                    && let Some(hook) = item.click_hook()
                {
                    hook(item);
                }
            }
            Reaction::Clicked { is_child } => {
                if let Some(item) = item
                    && let Some(handler) = &mut self.on_click
                {
                    handler(is_child, item);
                }
            }
            Reaction::Promote(id) => {
                if let Err(e) = self.promote_child(id) {
                    log::warn!("cannot promote {id}: {e}");
                }
            }
            Reaction::Demote => {
                if let Err(e) = self.demote_root() {
                    log::warn!("cannot demote: {e}");
                }
            }
            Reaction::Open(href) => self.listeners.trigger(&Signal::Open { href }),
            Reaction::ShowTitle(title) => {
                if let Some(surface) = self.surface {
                    self.scene.set_text(surface.title, title);
                }
            }
            Reaction::RestoreTitle => {
                if let Some(surface) = self.surface {
                    let title = self.current_root().title.clone();
                    self.scene.set_text(surface.title, title);
                }
            }
            Reaction::PauseAutoScroll => self.stop_auto_scroll(),
            Reaction::ResumeAutoScroll => {
                if self.options.auto_scroll {
                    self.start_auto_scroll(None);
                }
            }
            Reaction::RevealParent(shown) => {
                if let Some(hover) = self.views.get(view).and_then(ItemView::hover_group) {
                    self.scene.set_visible(hover, shown);
                }
            }
        }
    }
}

/// Gives every uncolored item in the subtree a generated fill.
fn paint(root: &mut MenuItem, fills: &mut FillGenerator) {
    root.for_each_mut(&mut |item: &mut MenuItem| {
        if item.fill.is_none() {
            item.fill = Some(fills.next_fill());
        }
    });
}
