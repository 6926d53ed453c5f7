use std::fmt::Write as _;

use astro_contracts::catalog::Catalog;
use astro_contracts::result::DecodedImage;
use astro_engine::codec::data_url;
use clap::ValueEnum;

use crate::shell::SessionContext;

pub const UPLOAD_PLACEHOLDER: &str = "Please upload an image to enhance";
pub const RESULT_PLACEHOLDER: &str = "Enhanced image will appear here";
pub const WAITING_MESSAGE: &str = "Enhancing your image... Please wait, this may take a minute.";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum Theme {
    #[default]
    Plain,
    Space,
}

/// Colors and labels for one theme.
#[derive(Debug, Clone, Copy)]
pub struct Palette {
    pub title: &'static str,
    pub background: &'static str,
    pub panel: &'static str,
    pub text: &'static str,
    pub accent: &'static str,
}

impl Theme {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Plain => "plain",
            Self::Space => "space",
        }
    }

    pub fn palette(self) -> Palette {
        match self {
            Self::Plain => Palette {
                title: "Astronomy Image Enhancer",
                background: "#f6f6f6",
                panel: "#ffffff",
                text: "#222222",
                accent: "#0066cc",
            },
            Self::Space => Palette {
                title: "\u{1F52D} Astronomy Image Enhancer",
                background: "#0b0d21",
                panel: "#161a3a",
                text: "#e6e8ff",
                accent: "#9d7bff",
            },
        }
    }

    fn heading(self, label: &str) -> String {
        match self {
            Self::Plain => format!("== {label} =="),
            Self::Space => format!("\u{2726} {label} \u{2726}"),
        }
    }
}

pub fn render_catalog(catalog: &Catalog, theme: Theme) -> String {
    let mut out = String::new();
    let _ = writeln!(
        out,
        "{} ({})",
        theme.heading("Models"),
        catalog.models_source().as_str()
    );
    push_numbered(&mut out, catalog.models());
    let _ = writeln!(
        out,
        "{} ({})",
        theme.heading("Presets"),
        catalog.presets_source().as_str()
    );
    push_numbered(&mut out, catalog.presets());
    out
}

pub fn render_settings(ctx: &SessionContext) -> String {
    let settings = &ctx.settings;
    let mut out = String::new();
    let _ = writeln!(out, "{}", ctx.theme.heading("Enhancement Settings"));
    let _ = writeln!(out, "Model: {}", settings.model_name);
    let _ = writeln!(out, "Preset: {}", settings.preset);
    let _ = writeln!(
        out,
        "Custom prompt: {}",
        settings.custom_prompt.as_deref().unwrap_or("(none)")
    );
    let _ = writeln!(out, "Noise level: {:.1}", settings.noise_level);
    let _ = writeln!(
        out,
        "Scientific mode: {}",
        if settings.scientific_mode { "on" } else { "off" }
    );
    out
}

/// Full text view: settings, original, result and comparison.
pub fn render_session(ctx: &SessionContext) -> String {
    let theme = ctx.theme;
    let mut out = String::new();
    let _ = writeln!(out, "{}", theme.palette().title);
    out.push_str(&render_settings(ctx));

    let _ = writeln!(out, "{}", theme.heading("Original Image"));
    match &ctx.upload {
        Some(upload) => {
            let _ = writeln!(
                out,
                "{} ({})",
                upload.file_name,
                describe_image(&upload.image)
            );
        }
        None => {
            let _ = writeln!(out, "{UPLOAD_PLACEHOLDER}");
        }
    }

    let _ = writeln!(out, "{}", theme.heading("Enhanced Result"));
    let Some(snapshot) = ctx.current() else {
        let _ = writeln!(out, "{RESULT_PLACEHOLDER}");
        return out;
    };
    let result = &snapshot.result;
    let _ = writeln!(out, "Enhanced image: {}", describe_image(&result.enhanced_image));
    let _ = writeln!(out, "Enhanced on: {}", snapshot.completed_at_label());
    let _ = writeln!(out, "Enhancement Prompt Used: {}", result.prompt_used);

    let _ = writeln!(out, "{}", theme.heading("Before vs After Comparison"));
    let [before, after] = result.before_after.as_pair();
    let _ = writeln!(
        out,
        "Original: {} | Enhanced: {}",
        describe_image(before),
        describe_image(after)
    );
    out
}

/// Self-contained HTML page with every image inlined as a data URL.
pub fn render_preview_html(ctx: &SessionContext) -> String {
    let palette = ctx.theme.palette();
    let settings = &ctx.settings;

    let original = match &ctx.upload {
        Some(upload) => image_figure(&upload.image, &upload.file_name),
        None => placeholder(UPLOAD_PLACEHOLDER),
    };

    let (enhanced, details, comparison) = match ctx.current() {
        Some(snapshot) => {
            let result = &snapshot.result;
            let [before, after] = result.before_after.as_pair();
            (
                image_figure(&result.enhanced_image, "enhanced"),
                format!(
                    "<p class='meta'>Enhanced on: {}</p><p class='prompt'><strong>Enhancement Prompt Used:</strong> {}</p>",
                    escape_html(&snapshot.completed_at_label()),
                    escape_html(&result.prompt_used),
                ),
                format!(
                    "<section class='panel'><h2>Before vs After Comparison</h2><div class='pair'>{}{}</div></section>",
                    image_figure(before, "before"),
                    image_figure(after, "after"),
                ),
            )
        }
        None => (placeholder(RESULT_PLACEHOLDER), String::new(), String::new()),
    };

    let custom_prompt = settings.custom_prompt.as_deref().unwrap_or("(none)");
    format!(
        "<!doctype html>\n<html>\n<head>\n  <meta charset='utf-8'>\n  <title>{title}</title>\n  <style>\n    body {{ font-family: Arial, sans-serif; background: {background}; color: {text}; margin: 0; padding: 20px; }}\n    h1 {{ color: {accent}; }}\n    .grid {{ display: grid; grid-template-columns: 1fr 1fr; gap: 16px; }}\n    .panel {{ background: {panel}; border-radius: 10px; padding: 12px; margin-bottom: 16px; box-shadow: 0 2px 8px rgba(0,0,0,0.08); }}\n    .pair {{ display: grid; grid-template-columns: 1fr 1fr; gap: 12px; }}\n    figure {{ margin: 0; }}\n    figure img {{ max-width: 100%; }}\n    figcaption, .meta {{ font-size: 12px; opacity: 0.8; }}\n    .placeholder {{ padding: 40px; text-align: center; border: 1px dashed {accent}; }}\n  </style>\n</head>\n<body>\n  <h1>{title}</h1>\n  <section class='panel'><h2>Enhancement Settings</h2><ul><li>Model: {model}</li><li>Preset: {preset}</li><li>Custom prompt: {custom_prompt}</li><li>Noise level: {noise:.1}</li><li>Scientific mode: {scientific}</li></ul></section>\n  <div class='grid'>\n    <section class='panel'><h2>Original Image</h2>{original}</section>\n    <section class='panel'><h2>Enhanced Result</h2>{enhanced}{details}</section>\n  </div>\n  {comparison}\n</body>\n</html>\n",
        title = escape_html(palette.title),
        background = palette.background,
        text = palette.text,
        accent = palette.accent,
        panel = palette.panel,
        model = escape_html(&settings.model_name),
        preset = escape_html(&settings.preset),
        custom_prompt = escape_html(custom_prompt),
        noise = settings.noise_level,
        scientific = if settings.scientific_mode { "on" } else { "off" },
    )
}

fn describe_image(image: &DecodedImage) -> String {
    format!("{}, {}", image.dimensions_label(), image.mime_type)
}

fn image_figure(image: &DecodedImage, caption: &str) -> String {
    format!(
        "<figure><img src='{src}' alt='{caption}'><figcaption>{caption} ({dims})</figcaption></figure>",
        src = data_url(&image.mime_type, &image.bytes),
        caption = escape_html(caption),
        dims = escape_html(&image.dimensions_label()),
    )
}

fn placeholder(message: &str) -> String {
    format!("<div class='placeholder'>{}</div>", escape_html(message))
}

fn push_numbered(out: &mut String, items: &[String]) {
    for (idx, item) in items.iter().enumerate() {
        let _ = writeln!(out, "  {}. {item}", idx + 1);
    }
}

pub fn escape_html(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for ch in value.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#x27;"),
            _ => out.push(ch),
        }
    }
    out
}
