use anyhow::{Context, Result};
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, info};
use ttf_parser::Face;
use usvg::fontdb;

use crate::settings::Settings;
use crate::styles::GenericFamily;

/// Font database shared by measurement and rasterization. Loaded once per
/// process; cloning only bumps the reference count.
#[derive(Clone)]
pub struct FontBook {
    db: Arc<fontdb::Database>,
}

#[derive(Debug, Clone)]
pub struct ResolvedFace {
    id: fontdb::ID,
    family: String,
}

impl ResolvedFace {
    /// Family name as the font itself reports it; this is what usvg matches.
    pub fn family(&self) -> &str {
        &self.family
    }
}

impl FontBook {
    pub fn load(settings: &Settings) -> Result<Self> {
        let mut db = fontdb::Database::new();
        db.load_system_fonts();
        if let Some(dir) = settings.font_dir.as_deref() {
            db.load_fonts_dir(dir);
        }
        if let Some(path) = settings.font_path.as_deref() {
            db.load_font_file(Path::new(path))
                .with_context(|| format!("failed to load font: {}", path))?;
        }
        let book = Self { db: Arc::new(db) };
        info!("font database ready ({} faces)", book.face_count());
        Ok(book)
    }

    /// No faces at all; widths come from the built-in estimate.
    pub fn empty() -> Self {
        Self {
            db: Arc::new(fontdb::Database::new()),
        }
    }

    pub fn database(&self) -> Arc<fontdb::Database> {
        Arc::clone(&self.db)
    }

    pub fn face_count(&self) -> usize {
        self.db.len()
    }

    /// Bold face for `family`, then the generic family, then the platform
    /// fallback list, then whatever face was loaded first.
    pub fn resolve(&self, family: &str, generic: GenericFamily) -> Option<ResolvedFace> {
        let mut attempts = vec![
            vec![fontdb::Family::Name(family)],
            vec![generic_family(generic)],
        ];
        attempts.extend(
            fallback_families()
                .iter()
                .map(|candidate| vec![fontdb::Family::Name(*candidate)]),
        );

        for families in &attempts {
            let query = fontdb::Query {
                families: families.as_slice(),
                weight: fontdb::Weight::BOLD,
                ..Default::default()
            };
            if let Some(face) = self.db.query(&query).and_then(|id| self.face(id)) {
                if face.family != family {
                    debug!("{} not installed; drawing with {}", family, face.family);
                }
                return Some(face);
            }
        }

        let face = self.db.faces().next().and_then(|info| self.face(info.id));
        match face.as_ref() {
            Some(face) => debug!("{} not installed; drawing with {}", family, face.family),
            None => debug!("no installed face for {}; estimating widths", family),
        }
        face
    }

    fn face(&self, id: fontdb::ID) -> Option<ResolvedFace> {
        let info = self.db.face(id)?;
        let (family, _) = info.families.first()?;
        Some(ResolvedFace {
            id,
            family: family.clone(),
        })
    }

    pub fn measure_text_width_px(
        &self,
        text: &str,
        font_size: f32,
        face: Option<&ResolvedFace>,
    ) -> f32 {
        if let Some(face) = face {
            let measured = self
                .db
                .with_face_data(face.id, |data, index| {
                    Face::parse(data, index)
                        .ok()
                        .map(|face| face_advance_px(&face, text, font_size))
                })
                .flatten();
            if let Some(width) = measured {
                return width;
            }
        }
        estimate_text_width_units(text) * font_size
    }
}

#[cfg(target_os = "macos")]
fn fallback_families() -> &'static [&'static str] {
    &["Helvetica", "Hiragino Sans", "Noto Sans"]
}

#[cfg(target_os = "windows")]
fn fallback_families() -> &'static [&'static str] {
    &["Arial", "Segoe UI", "Noto Sans"]
}

#[cfg(not(any(target_os = "macos", target_os = "windows")))]
fn fallback_families() -> &'static [&'static str] {
    &["DejaVu Sans", "Liberation Sans", "Noto Sans", "NotoSans"]
}

fn generic_family(generic: GenericFamily) -> fontdb::Family<'static> {
    match generic {
        GenericFamily::SansSerif => fontdb::Family::SansSerif,
        GenericFamily::Serif => fontdb::Family::Serif,
        GenericFamily::Monospace => fontdb::Family::Monospace,
        GenericFamily::Cursive => fontdb::Family::Cursive,
    }
}

fn face_advance_px(face: &Face<'_>, text: &str, font_size: f32) -> f32 {
    let units_per_em = face.units_per_em().max(1);
    let space_advance = face
        .glyph_index(' ')
        .and_then(|id| face.glyph_hor_advance(id))
        .unwrap_or(units_per_em / 2);
    let mut advance = 0u32;
    for ch in text.chars() {
        if ch == '\n' {
            continue;
        }
        let glyph_advance = face
            .glyph_index(ch)
            .and_then(|glyph| face.glyph_hor_advance(glyph))
            .unwrap_or(space_advance);
        advance = advance.saturating_add(glyph_advance as u32);
    }
    advance as f32 * (font_size / units_per_em as f32)
}

fn estimate_char_units_for_width(ch: char) -> f32 {
    if ch.is_whitespace() {
        0.28
    } else if ch.is_ascii_uppercase() || ch.is_ascii_digit() {
        0.68
    } else if ch.is_ascii_alphanumeric() {
        0.58
    } else if ch.is_ascii() {
        0.38
    } else if matches!(
        ch as u32,
        0x4E00..=0x9FFF | 0x3040..=0x30FF | 0x31F0..=0x31FF | 0xAC00..=0xD7AF
    ) {
        1.0
    } else {
        0.9
    }
}

fn estimate_text_width_units(text: &str) -> f32 {
    text.chars().map(estimate_char_units_for_width).sum()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_book_estimates_widths() {
        let book = FontBook::empty();
        assert!(book.resolve("Impact", GenericFamily::SansSerif).is_none());
        let narrow = book.measure_text_width_px("ii", 20.0, None);
        let wide = book.measure_text_width_px("WW", 20.0, None);
        assert!(wide > narrow);
        assert_eq!(book.measure_text_width_px("", 20.0, None), 0.0);
    }

    #[test]
    fn estimate_scales_with_font_size() {
        let book = FontBook::empty();
        let small = book.measure_text_width_px("SALE today", 10.0, None);
        let large = book.measure_text_width_px("SALE today", 40.0, None);
        assert!((large - small * 4.0).abs() < 0.001);
    }
}
