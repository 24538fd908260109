//! Paints a menu [`Scene`] with cairo.

use crate::gui::theme::ThemeColors;
use cairo::Context;
use gdk_pixbuf::{Pixbuf, PixbufLoader};
use gdk4::prelude::*;
use palette::Srgba;
use spiral::scene::{Element, ElementKind, Stroke, TextPlacement};
use spiral::{ElementId, Path, Point, Rect, Scene};
use std::collections::HashMap;
use std::f64::consts::{FRAC_PI_2, PI};

const TEXT_ICON_SIZE: f64 = 22.0;
const ROOT_TITLE_SIZE: f64 = 15.0;
const TITLE_SIZE: f64 = 16.0;

/// Decoded background images by URL.
#[derive(Default)]
pub struct ImageCache {
    pixbufs: HashMap<String, Pixbuf>,
}

impl ImageCache {
    pub fn insert_bytes(&mut self, url: &str, bytes: &[u8]) -> Result<(), glib::Error> {
        let loader = PixbufLoader::new();
        loader.write(bytes)?;
        loader.close()?;
        if let Some(pixbuf) = loader.pixbuf() {
            self.pixbufs.insert(url.to_string(), pixbuf);
        }
        Ok(())
    }

    pub fn get(&self, url: &str) -> Option<&Pixbuf> {
        self.pixbufs.get(url)
    }
}

pub struct SceneRenderer<'a> {
    scene: &'a Scene,
    images: &'a ImageCache,
    colors: &'a ThemeColors,
}

impl<'a> SceneRenderer<'a> {
    pub fn new(scene: &'a Scene, images: &'a ImageCache, colors: &'a ThemeColors) -> Self {
        Self {
            scene,
            images,
            colors,
        }
    }

    pub fn draw(&self, cr: &Context) -> Result<(), cairo::Error> {
        self.draw_element(cr, self.scene.root())
    }

    fn draw_element(&self, cr: &Context, id: ElementId) -> Result<(), cairo::Error> {
        let Some(element) = self.scene.get(id) else {
            return Ok(());
        };
        if !element.visible || element.opacity <= 0.0 {
            return Ok(());
        }

        let faded = element.opacity < 1.0;
        if faded {
            cr.push_group();
        }
        match &element.kind {
            ElementKind::Group => {
                for child in &element.children {
                    self.draw_element(cr, *child)?;
                }
            }
            ElementKind::Shape {
                d,
                fill,
                stroke,
                offset,
            } => self.draw_shape(cr, element, d, *fill, *stroke, *offset)?,
            ElementKind::Image { href, rect, .. } => self.draw_image(cr, id, href, *rect)?,
            ElementKind::Text { content, placement } => {
                self.draw_text(cr, element, content, placement)?
            }
            ElementKind::ClipPath => {}
        }
        if faded {
            cr.pop_group_to_source()?;
            cr.paint_with_alpha(element.opacity)?;
        }
        Ok(())
    }

    fn draw_shape(
        &self,
        cr: &Context,
        element: &Element,
        d: &Path,
        fill: Option<Srgba<f64>>,
        stroke: Option<Stroke>,
        offset: Point,
    ) -> Result<(), cairo::Error> {
        cr.save()?;
        cr.translate(offset.x, offset.y);
        trace(cr, d);

        if element.has_class("shadow-circle") {
            self.shade_disc(cr, d)?;
        } else if element.has_class("hover-circle") {
            set_source(cr, self.colors.hover);
            cr.fill_preserve()?;
        } else if let Some(color) = fill {
            set_source(cr, color);
            cr.fill_preserve()?;
        } else if element.has_class("main-shape") {
            set_source(cr, self.colors.slice);
            cr.fill_preserve()?;
        }

        if let Some(stroke) = stroke {
            set_source(cr, stroke.color);
            cr.set_line_width(stroke.width);
            cr.set_line_cap(cairo::LineCap::Round);
            cr.set_line_join(cairo::LineJoin::Round);
            cr.stroke_preserve()?;
        }
        cr.new_path();
        cr.restore()
    }

    /// Darkens the rim of the central disc.
    fn shade_disc(&self, cr: &Context, d: &Path) -> Result<(), cairo::Error> {
        let Some(bbox) = d.bounding_box() else {
            return Ok(());
        };
        let center = bbox.center();
        let radius = bbox.w / 2.0;
        let gradient = cairo::RadialGradient::new(
            center.x,
            center.y,
            radius * 0.8,
            center.x,
            center.y,
            radius,
        );
        let (r, g, b, a) = self.colors.shadow.into_components();
        gradient.add_color_stop_rgba(0.0, r, g, b, 0.0);
        gradient.add_color_stop_rgba(1.0, r, g, b, a);
        cr.set_source(&gradient)?;
        cr.fill_preserve()
    }

    fn draw_image(
        &self,
        cr: &Context,
        id: ElementId,
        href: &str,
        rect: Rect,
    ) -> Result<(), cairo::Error> {
        let Some(pixbuf) = self.images.get(href) else {
            return Ok(());
        };
        let (pw, ph) = (pixbuf.width() as f64, pixbuf.height() as f64);
        if rect.w <= 0.0 || rect.h <= 0.0 || pw <= 0.0 || ph <= 0.0 {
            return Ok(());
        }

        cr.save()?;
        if let Some(ElementKind::Shape { d, offset, .. }) = self
            .scene
            .clip_shape(id)
            .and_then(|shape| self.scene.get(shape))
            .map(|e| &e.kind)
        {
            cr.translate(offset.x, offset.y);
            trace(cr, d);
            cr.translate(-offset.x, -offset.y);
            cr.clip();
        }

        // cover the rect, centered
        let scale = (rect.w / pw).max(rect.h / ph);
        let center = rect.center();
        cr.translate(center.x - pw * scale / 2.0, center.y - ph * scale / 2.0);
        cr.scale(scale, scale);
        cr.set_source_pixbuf(pixbuf, 0.0, 0.0);
        cr.paint()?;
        cr.restore()
    }

    fn draw_text(
        &self,
        cr: &Context,
        element: &Element,
        content: &str,
        placement: &TextPlacement,
    ) -> Result<(), cairo::Error> {
        if content.is_empty() {
            return Ok(());
        }
        cr.save()?;
        match placement {
            TextPlacement::At(at) => {
                let (size, color) = if element.has_class("text-icon") {
                    (TEXT_ICON_SIZE, self.colors.text_icon)
                } else if element.has_class("root-title") {
                    (ROOT_TITLE_SIZE, self.colors.text_icon)
                } else {
                    (ROOT_TITLE_SIZE, self.colors.text)
                };
                cr.select_font_face("Sans", cairo::FontSlant::Normal, cairo::FontWeight::Bold);
                cr.set_font_size(size);
                set_source(cr, color);
                let ext = cr.text_extents(content)?;
                cr.move_to(
                    at.x - ext.width() / 2.0 - ext.x_bearing(),
                    at.y + ext.height() / 2.0,
                );
                cr.show_text(content)?;
            }
            TextPlacement::OnPath { path, offset, dy } => {
                cr.select_font_face("Sans", cairo::FontSlant::Normal, cairo::FontWeight::Normal);
                cr.set_font_size(TITLE_SIZE);
                set_source(cr, self.colors.text);
                draw_on_circle(cr, path, content, *offset, *dy)?;
            }
        }
        cr.restore()
    }
}

fn set_source(cr: &Context, color: Srgba<f64>) {
    let (r, g, b, a) = color.into_components();
    cr.set_source_rgba(r, g, b, a);
}

fn trace(cr: &Context, path: &Path) {
    for sub in path.to_cubics().subpaths {
        cr.move_to(sub.start.x, sub.start.y);
        for [c1, c2, to] in sub.curves {
            cr.curve_to(c1.x, c1.y, c2.x, c2.y, to.x, to.y);
        }
        if sub.closed {
            cr.close_path();
        }
    }
}

/// Lays `text` along a circular path, centered at `offset` of its length
/// measured from the path's start, `dy` outwards negative.
fn draw_on_circle(
    cr: &Context,
    path: &Path,
    text: &str,
    offset: f64,
    dy: f64,
) -> Result<(), cairo::Error> {
    let start = path.to_cubics().subpaths.first().map(|s| s.start);
    let (Some(bbox), Some(start)) = (path.bounding_box(), start) else {
        return Ok(());
    };
    let center = bbox.center();
    let radius = bbox.w / 2.0 - dy;
    if radius <= 0.0 {
        return Ok(());
    }

    let start_angle = (start.y - center.y).atan2(start.x - center.x);
    let middle = start_angle + 2.0 * PI * offset;

    let glyphs: Vec<(String, f64)> = text
        .chars()
        .map(|c| {
            let s = c.to_string();
            let advance = cr.text_extents(&s).map(|e| e.x_advance()).unwrap_or_default();
            (s, advance)
        })
        .collect();
    let total: f64 = glyphs.iter().map(|(_, w)| w).sum();

    let mut along = -total / 2.0;
    for (glyph, advance) in glyphs {
        let angle = middle + (along + advance / 2.0) / radius;
        cr.save()?;
        cr.translate(center.x + radius * angle.cos(), center.y + radius * angle.sin());
        cr.rotate(angle + FRAC_PI_2);
        cr.move_to(-advance / 2.0, 0.0);
        cr.show_text(&glyph)?;
        cr.restore()?;
        along += advance;
    }
    Ok(())
}
