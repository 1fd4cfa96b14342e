use serde::Serialize;

pub const DEFAULT_STYLE: &str = "modern";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum GenericFamily {
    SansSerif,
    Serif,
    Monospace,
    Cursive,
}

impl GenericFamily {
    pub fn as_css(&self) -> &'static str {
        match self {
            GenericFamily::SansSerif => "sans-serif",
            GenericFamily::Serif => "serif",
            GenericFamily::Monospace => "monospace",
            GenericFamily::Cursive => "cursive",
        }
    }
}

/// Default placement and font for one overlay style.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct StyleConfig {
    pub key: &'static str,
    pub label: &'static str,
    pub font_family: &'static str,
    pub generic_family: GenericFamily,
    pub x: f64,
    pub y: f64,
    pub size: f64,
    pub color: &'static str,
}

const STYLES: [StyleConfig; 7] = [
    StyleConfig {
        key: "bold",
        label: "Bold & Brutal",
        font_family: "Arial Black",
        generic_family: GenericFamily::SansSerif,
        x: 0.5,
        y: 0.3,
        size: 0.18,
        color: "#FFFF00",
    },
    StyleConfig {
        key: "modern",
        label: "Clean & Modern",
        font_family: "Segoe UI",
        generic_family: GenericFamily::SansSerif,
        x: 0.5,
        y: 0.5,
        size: 0.15,
        color: "#FFFFFF",
    },
    StyleConfig {
        key: "scifi",
        label: "Futuristic & Sci-Fi",
        font_family: "Courier New",
        generic_family: GenericFamily::Monospace,
        x: 0.5,
        y: 0.6,
        size: 0.12,
        color: "#00FF00",
    },
    StyleConfig {
        key: "horror",
        label: "Spooky & Horror",
        font_family: "Impact",
        generic_family: GenericFamily::SansSerif,
        x: 0.5,
        y: 0.25,
        size: 0.2,
        color: "#FF0000",
    },
    StyleConfig {
        key: "handwritten",
        label: "Handwritten & Organic",
        font_family: "Comic Sans MS",
        generic_family: GenericFamily::Cursive,
        x: 0.35,
        y: 0.7,
        size: 0.1,
        color: "#8B4513",
    },
    StyleConfig {
        key: "retro",
        label: "Retro & Pixelated",
        font_family: "Georgia",
        generic_family: GenericFamily::Serif,
        x: 0.5,
        y: 0.5,
        size: 0.08,
        color: "#FF69B4",
    },
    StyleConfig {
        key: "elegant",
        label: "Elegant & Classy",
        font_family: "Palatino Linotype",
        generic_family: GenericFamily::Serif,
        x: 0.5,
        y: 0.8,
        size: 0.12,
        color: "#FFD700",
    },
];

pub fn all_styles() -> &'static [StyleConfig] {
    &STYLES
}

pub fn find_style(key: &str) -> Option<&'static StyleConfig> {
    STYLES.iter().find(|style| style.key == key)
}

/// Unknown keys resolve to the "modern" entry.
pub fn style_or_default(key: &str) -> &'static StyleConfig {
    find_style(key).unwrap_or(&STYLES[1])
}
