use gtk::gdk;
use gtk::prelude::*;
use gtk4 as gtk;
use palette::Srgba;

pub struct ThemeColors {
    /// Ring title and the indicator.
    pub text: Srgba<f64>,
    pub text_icon: Srgba<f64>,
    /// Slices whose item has no color.
    pub slice: Srgba<f64>,
    /// Edge of the central disc's shading.
    pub shadow: Srgba<f64>,
    /// Darkening over the root while its parent is previewed.
    pub hover: Srgba<f64>,
}

impl ThemeColors {
    pub fn from_context(context: &gtk::StyleContext) -> Self {
        Self {
            text: Self::lookup_color(
                context,
                "theme_fg_color",
                Srgba::new(0.2, 0.2, 0.2, 1.0),
                None,
            ),
            text_icon: Srgba::new(1.0, 1.0, 1.0, 0.9),
            slice: Self::lookup_color(
                context,
                "theme_selected_bg_color",
                Srgba::new(0.4, 0.4, 0.8, 0.9),
                Some(0.9),
            ),
            shadow: Srgba::new(0.0, 0.0, 0.0, 0.35),
            hover: Srgba::new(0.0, 0.0, 0.0, 0.5),
        }
    }

    fn lookup_color(
        context: &gtk::StyleContext,
        name: &str,
        fallback: Srgba<f64>,
        alpha_override: Option<f64>,
    ) -> Srgba<f64> {
        context
            .lookup_color(name)
            .map(|c| {
                let (r, g, b, a) = (
                    c.red() as f64,
                    c.green() as f64,
                    c.blue() as f64,
                    c.alpha() as f64,
                );
                Srgba::new(r, g, b, alpha_override.unwrap_or(a))
            })
            .unwrap_or(fallback)
    }
}

pub fn load_css() {
    let provider = gtk::CssProvider::new();
    let css_data = "
.spiral-indicator {
    font-size: small;
    opacity: 0.7;
}
.spiral-error {
    color: @error_color;
}
";
    provider.load_from_data(css_data);

    if let Some(display) = gdk::Display::default() {
        gtk::style_context_add_provider_for_display(
            &display,
            &provider,
            gtk::STYLE_PROVIDER_PRIORITY_APPLICATION,
        );
    }
}
