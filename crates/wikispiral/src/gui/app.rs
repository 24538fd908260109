use crate::config::{self, Config, Overrides};
use crate::events::{AppEvent, Request};
use crate::explorer::{Effect, Explorer};
use crate::gui::render::{ImageCache, SceneRenderer};
use crate::gui::theme::{self, ThemeColors};
use crate::input::{self, Paging, SpamGuard};
use gtk::prelude::*;
use gtk4 as gtk;
use relm4::prelude::*;
use spiral::{Layout, Menu, Point};
use std::cell::RefCell;
use std::path::PathBuf;
use std::rc::Rc;
use std::time::{Duration, Instant};

const FRAME: Duration = Duration::from_millis(16);

pub struct AppInit {
    pub config: Config,
    pub config_path: Option<PathBuf>,
    pub overrides: Overrides,
    pub requests: async_channel::Sender<Request>,
    pub events: async_channel::Receiver<AppEvent>,
}

pub struct AppModel {
    pub explorer: Rc<RefCell<Explorer>>,
    pub images: Rc<RefCell<ImageCache>>,
    pub requests: async_channel::Sender<Request>,
    pub config_path: Option<PathBuf>,
    pub overrides: Overrides,
    pub drawing_area: gtk::DrawingArea,
    pub started: Instant,
    pub wheel_guard: SpamGuard,
    pub title: String,
    pub indicator: String,
    pub panel: String,
    pub status: String,
    pub loading: bool,
}

#[derive(Debug)]
pub enum AppMsg {
    Event(AppEvent),
    Tick,
    Hover(f64, f64),
    Leave,
    Click(f64, f64),
    Wheel(f64),
    Swipe(f64),
    Page(Paging),
    Quit,
}

impl From<AppEvent> for AppMsg {
    fn from(event: AppEvent) -> Self {
        AppMsg::Event(event)
    }
}

/// Offset that centers the scene in an area of the given size.
fn centering(width: f64, height: f64, layout: &Layout) -> (f64, f64) {
    (
        ((width - layout.canvas_width) / 2.0).max(0.0),
        ((height - layout.canvas_height) / 2.0).max(0.0),
    )
}

fn key_paging(key: gtk::gdk::Key, state: gtk::gdk::ModifierType) -> Option<Paging> {
    use gtk::gdk::Key;
    let shift = state.contains(gtk::gdk::ModifierType::SHIFT_MASK);
    if key == Key::space {
        Some(if shift { Paging::Backward } else { Paging::Forward })
    } else if key == Key::Right || key == Key::Down {
        Some(Paging::Forward)
    } else if key == Key::Left || key == Key::Up {
        Some(Paging::Backward)
    } else {
        None
    }
}

#[relm4::component(pub)]
impl SimpleComponent for AppModel {
    type Init = AppInit;
    type Input = AppMsg;
    type Output = ();

    view! {
        #[root]
        #[name = "window"]
        gtk::ApplicationWindow {
            #[watch]
            set_title: Some(&model.title),
            set_default_size: (layout.canvas_width as i32 + 40, layout.canvas_height as i32 + 100),

            add_controller = gtk::EventControllerKey {
                connect_key_pressed[sender] => move |_, key, _, state| {
                    if key == gtk::gdk::Key::Escape {
                        sender.input(AppMsg::Quit);
                        return glib::Propagation::Stop;
                    }
                    if let Some(paging) = key_paging(key, state) {
                        sender.input(AppMsg::Page(paging));
                        return glib::Propagation::Stop;
                    }
                    glib::Propagation::Proceed
                }
            },

            gtk::Box {
                set_orientation: gtk::Orientation::Vertical,
                set_spacing: 4,

                gtk::Label {
                    add_css_class: "spiral-indicator",
                    #[watch]
                    set_label: &model.indicator,
                },

                #[name = "drawing_area"]
                gtk::DrawingArea {
                    set_hexpand: true,
                    set_vexpand: true,
                    set_content_width: layout.canvas_width as i32,
                    set_content_height: layout.canvas_height as i32,
                    #[watch]
                    set_sensitive: !model.loading,

                    add_controller = gtk::EventControllerMotion {
                        connect_motion[sender] => move |_, x, y| {
                            sender.input(AppMsg::Hover(x, y));
                        },
                        connect_leave[sender] => move |_| {
                            sender.input(AppMsg::Leave);
                        }
                    },

                    add_controller = gtk::GestureClick {
                        connect_pressed[sender] => move |_, _, x, y| {
                            sender.input(AppMsg::Click(x, y));
                        }
                    },

                    add_controller = gtk::GestureDrag {
                        set_touch_only: true,
                        connect_drag_end[sender] => move |_, _, dy| {
                            sender.input(AppMsg::Swipe(dy));
                        }
                    },

                    add_controller = gtk::EventControllerScroll::new(gtk::EventControllerScrollFlags::VERTICAL) {
                        connect_scroll[sender] => move |_, _, dy| {
                            sender.input(AppMsg::Wheel(dy));
                            glib::Propagation::Stop
                        }
                    }
                },

                gtk::Label {
                    add_css_class: "spiral-error",
                    #[watch]
                    set_label: &model.status,
                    #[watch]
                    set_visible: !model.status.is_empty(),
                },

                gtk::LinkButton {
                    #[watch]
                    set_uri: &model.panel,
                    #[watch]
                    set_label: &model.panel,
                    #[watch]
                    set_visible: !model.panel.is_empty(),
                },
            }
        }
    }

    fn init(
        init: Self::Init,
        root: Self::Root,
        sender: ComponentSender<Self>,
    ) -> ComponentParts<Self> {
        let AppInit {
            config,
            config_path,
            overrides,
            requests,
            events,
        } = init;

        theme::load_css();

        let layout = Layout::new(config.size);
        let model = AppModel {
            explorer: Rc::new(RefCell::new(Explorer::new(config))),
            images: Rc::new(RefCell::new(ImageCache::default())),
            requests,
            config_path,
            overrides,
            drawing_area: gtk::DrawingArea::default(),
            started: Instant::now(),
            wheel_guard: SpamGuard::default(),
            title: "Wikidata spiral".into(),
            indicator: String::new(),
            panel: String::new(),
            status: String::new(),
            loading: false,
        };

        let widgets = view_output!();

        let mut model = model;
        model.drawing_area = widgets.drawing_area.clone();

        let explorer = model.explorer.clone();
        let images = model.images.clone();
        widgets
            .drawing_area
            .set_draw_func(move |drawing_area, cr, width, height| {
                let explorer = explorer.borrow();
                let Some(menu) = explorer.menu() else {
                    return;
                };
                let colors = ThemeColors::from_context(&drawing_area.style_context());
                let (dx, dy) = centering(width as f64, height as f64, menu.layout());
                cr.translate(dx, dy);
                let images = images.borrow();
                if let Err(e) = SceneRenderer::new(menu.scene(), &images, &colors).draw(cr) {
                    log::error!("Drawing error: {}", e);
                }
            });

        let sender_clone = sender.clone();
        relm4::spawn(async move {
            while let Ok(event) = events.recv().await {
                sender_clone.input(AppMsg::from(event));
            }
        });

        let tick_sender = sender.clone();
        glib::timeout_add_local(FRAME, move || {
            tick_sender.input(AppMsg::Tick);
            glib::ControlFlow::Continue
        });

        let effects = model.explorer.borrow_mut().start();
        model.apply(effects, &sender);
        model.refresh();

        ComponentParts { model, widgets }
    }

    fn update(&mut self, msg: Self::Input, sender: ComponentSender<Self>) {
        let mut dirty = true;
        let effects = match msg {
            AppMsg::Event(AppEvent::ConfigReload) => self.reload(),
            AppMsg::Event(event) => {
                if let AppEvent::Thumbnail { url, bytes, .. } = &event
                    && let Err(e) = self.images.borrow_mut().insert_bytes(url, bytes)
                {
                    log::warn!("Cannot decode {}: {}", url, e);
                }
                self.explorer.borrow_mut().handle(event)
            }
            AppMsg::Tick => {
                let now = self.started.elapsed();
                dirty = self.with_menu(|m| m.tick(now)).unwrap_or(false);
                self.explorer.borrow_mut().drain()
            }
            AppMsg::Hover(x, y) => {
                let point = self.to_scene(x, y);
                self.with_menu(|m| m.hover_at(point));
                Vec::new()
            }
            AppMsg::Leave => {
                self.with_menu(Menu::pointer_left);
                Vec::new()
            }
            AppMsg::Click(x, y) => {
                if !self.explorer.borrow().is_loading() {
                    let point = self.to_scene(x, y);
                    self.with_menu(|m| m.click_at(point));
                }
                self.explorer.borrow_mut().drain()
            }
            AppMsg::Wheel(dy) => {
                if self.wheel_guard.allow(Instant::now()) {
                    self.page(input::wheel(dy));
                }
                Vec::new()
            }
            AppMsg::Swipe(dy) => {
                if let Some(paging) = input::swipe(dy) {
                    self.page(paging);
                }
                Vec::new()
            }
            AppMsg::Page(paging) => {
                self.page(paging);
                Vec::new()
            }
            AppMsg::Quit => {
                relm4::main_application().quit();
                Vec::new()
            }
        };

        dirty |= !effects.is_empty();
        self.apply(effects, &sender);
        if dirty {
            self.refresh();
            self.drawing_area.queue_draw();
        }
    }
}

impl AppModel {
    fn with_menu<R>(&self, f: impl FnOnce(&mut Menu) -> R) -> Option<R> {
        self.explorer.borrow_mut().menu_mut().map(f)
    }

    fn to_scene(&self, x: f64, y: f64) -> Point {
        let explorer = self.explorer.borrow();
        let Some(menu) = explorer.menu() else {
            return Point::new(x, y);
        };
        let (dx, dy) = centering(
            self.drawing_area.width() as f64,
            self.drawing_area.height() as f64,
            menu.layout(),
        );
        Point::new(x - dx, y - dy)
    }

    fn page(&self, paging: Paging) {
        self.with_menu(|m| match paging {
            Paging::Forward => m.next(),
            Paging::Backward => m.previous(),
        });
    }

    fn apply(&self, effects: Vec<Effect>, sender: &ComponentSender<Self>) {
        for effect in effects {
            match effect {
                Effect::Fetch(request) => {
                    if let Err(e) = self.requests.try_send(request) {
                        log::error!("Background runtime unavailable: {}", e);
                    }
                }
                Effect::NextAfter(delay) => {
                    let sender = sender.clone();
                    glib::timeout_add_local_once(delay, move || {
                        sender.input(AppMsg::Page(Paging::Forward));
                    });
                }
                Effect::Open(href) => {
                    if let Err(e) = std::process::Command::new("xdg-open").arg(&href).spawn() {
                        log::error!("Failed to open {}: {}", href, e);
                    }
                }
            }
        }
    }

    fn refresh(&mut self) {
        let explorer = self.explorer.borrow();
        self.loading = explorer.is_loading();
        self.indicator = explorer.indicator().unwrap_or_default();
        self.panel = explorer.panel_url().unwrap_or_default().to_string();
        self.status = match explorer.error() {
            Some(error) => error.to_string(),
            None if self.loading => "Loading…".into(),
            None => String::new(),
        };
        if let Some(menu) = explorer.menu() {
            self.title = menu.current_root().title.clone();
        }
    }

    fn reload(&mut self) -> Vec<Effect> {
        let new_config = config::load_or_default(self.config_path.as_deref(), &self.overrides);
        if let Err(e) = new_config.validate() {
            log::error!("Failed to reload config: {}", e);
            return Vec::new();
        }
        if &new_config == self.explorer.borrow().config() {
            return Vec::new();
        }

        let layout = Layout::new(new_config.size);
        self.drawing_area.set_content_width(layout.canvas_width as i32);
        self.drawing_area.set_content_height(layout.canvas_height as i32);
        self.explorer.replace(Explorer::new(new_config));
        log::info!("Configuration reloaded");
        self.explorer.borrow_mut().start()
    }
}
