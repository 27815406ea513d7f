use fontdb::{Database, Family, Query, Stretch, Style, Weight};
use once_cell::sync::Lazy;
use std::collections::HashMap;
use std::fs;
use std::hash::{Hash, Hasher};
use std::path::PathBuf;
use std::sync::Mutex;
use ttf_parser::Face;

use crate::config::LayoutConfig;
use crate::layout::text::fallback_text_width;

/// Content measurement seam used by leaf and header sizing.
///
/// Returning `None` means the text could not be measured; the layout pass then
/// records a `MeasurementFailure` and falls back to a default size.
pub trait TextMeasure {
    fn text_width(&self, text: &str, font_size: f32) -> Option<f32>;
}

/// Deterministic per-character width table. Never fails.
#[derive(Debug, Clone, Copy, Default)]
pub struct HeuristicMeasure;

impl TextMeasure for HeuristicMeasure {
    fn text_width(&self, text: &str, font_size: f32) -> Option<f32> {
        Some(fallback_text_width(text, font_size))
    }
}

/// Measures with the advances of an installed system font.
#[derive(Debug, Clone)]
pub struct FontMeasure {
    family: String,
}

impl FontMeasure {
    pub fn new(family: impl Into<String>) -> Self {
        Self {
            family: family.into(),
        }
    }
}

impl TextMeasure for FontMeasure {
    fn text_width(&self, text: &str, font_size: f32) -> Option<f32> {
        measure_text_width(text, font_size, &self.family)
    }
}

/// Picks the measurer selected by `fastTextMetrics`.
pub fn measurer_for(config: &LayoutConfig) -> Box<dyn TextMeasure> {
    if config.fast_text_metrics {
        Box::new(HeuristicMeasure)
    } else {
        Box::new(FontMeasure::new(config.font_family.clone()))
    }
}

static FONT_REGISTRY: Lazy<Mutex<FontRegistry>> = Lazy::new(|| Mutex::new(FontRegistry::new()));

pub fn measure_text_width(text: &str, font_size: f32, font_family: &str) -> Option<f32> {
    if text.is_empty() || font_size <= 0.0 {
        return Some(0.0);
    }
    let mut guard = FONT_REGISTRY.lock().ok()?;
    guard.measure(text, font_size, font_family)
}

struct FontRegistry {
    db: Database,
    loaded_system_fonts: bool,
    faces: HashMap<String, Option<FontAdvances>>,
}

impl FontRegistry {
    fn new() -> Self {
        Self {
            db: Database::new(),
            loaded_system_fonts: false,
            faces: HashMap::new(),
        }
    }

    fn measure(&mut self, text: &str, font_size: f32, font_family: &str) -> Option<f32> {
        let key = normalize_family_key(font_family);
        if !self.faces.contains_key(&key) {
            let face = load_cached_face(&key).or_else(|| self.load_face(&key));
            self.faces.insert(key.clone(), face);
        }
        let face = self.faces.get_mut(&key)?.as_mut()?;
        Some(face.width(&text.replace('\t', "    "), font_size))
    }

    fn load_face(&mut self, family_key: &str) -> Option<FontAdvances> {
        let names: Vec<&str> = family_key
            .split(',')
            .map(|part| part.trim().trim_matches('"').trim_matches('\''))
            .filter(|part| !part.is_empty())
            .collect();
        let mut families: Vec<Family<'_>> = names
            .iter()
            .copied()
            .map(|name| match name.to_ascii_lowercase().as_str() {
                "serif" => Family::Serif,
                "sans-serif" | "system-ui" | "ui-sans-serif" => Family::SansSerif,
                "monospace" | "ui-monospace" => Family::Monospace,
                "cursive" => Family::Cursive,
                "fantasy" => Family::Fantasy,
                _ => Family::Name(name),
            })
            .collect();
        if families.is_empty() {
            families.push(Family::SansSerif);
        }

        if !self.loaded_system_fonts {
            self.db.load_system_fonts();
            self.loaded_system_fonts = true;
        }

        let query = Query {
            families: &families,
            weight: Weight::NORMAL,
            stretch: Stretch::Normal,
            style: Style::Normal,
        };
        let id = self.db.query(&query)?;
        self.db
            .with_face_data(id, |data, index| {
                let advances = FontAdvances::parse(data.to_vec(), index)?;
                store_cached_face(family_key, data, index);
                Some(advances)
            })
            .flatten()
    }
}

/// Font bytes plus a lazily filled per-character advance table.
struct FontAdvances {
    data: Vec<u8>,
    index: u32,
    units_per_em: u16,
    ascii: [u16; 128],
    others: HashMap<char, Option<u16>>,
}

impl FontAdvances {
    fn parse(data: Vec<u8>, index: u32) -> Option<Self> {
        let face = Face::parse(&data, index).ok()?;
        let units_per_em = face.units_per_em().max(1);
        let mut ascii = [0u16; 128];
        for byte in 0u8..=127 {
            if let Some(glyph) = face.glyph_index(byte as char) {
                ascii[byte as usize] = face.glyph_hor_advance(glyph).unwrap_or(0);
            }
        }
        Some(Self {
            data,
            index,
            units_per_em,
            ascii,
            others: HashMap::new(),
        })
    }

    fn width(&mut self, text: &str, font_size: f32) -> f32 {
        let scale = font_size / self.units_per_em as f32;
        let fallback = font_size * 0.56;
        let missing: Vec<char> = text
            .chars()
            .filter(|ch| !ch.is_ascii() && !self.others.contains_key(ch))
            .collect();
        if !missing.is_empty() {
            let face = Face::parse(&self.data, self.index).ok();
            for ch in missing {
                let advance = face.as_ref().and_then(|face| {
                    face.glyph_index(ch)
                        .and_then(|glyph| face.glyph_hor_advance(glyph))
                });
                self.others.insert(ch, advance);
            }
        }

        text.chars()
            .filter(|ch| *ch != '\n')
            .map(|ch| {
                let advance = if ch.is_ascii() {
                    Some(self.ascii[ch as usize]).filter(|advance| *advance > 0)
                } else {
                    self.others.get(&ch).copied().flatten()
                };
                advance.map_or(fallback, |advance| advance as f32 * scale)
            })
            .sum::<f32>()
            .max(0.0)
    }
}

fn normalize_family_key(font_family: &str) -> String {
    let trimmed = font_family.trim();
    if trimmed.is_empty() {
        "sans-serif".to_string()
    } else {
        trimmed.to_string()
    }
}

fn cache_paths(family_key: &str) -> Option<(PathBuf, PathBuf)> {
    let base = std::env::var_os("XDG_CACHE_HOME")
        .map(PathBuf::from)
        .or_else(|| std::env::var_os("HOME").map(|home| PathBuf::from(home).join(".cache")))?;
    let mut hasher = std::collections::hash_map::DefaultHasher::new();
    family_key.hash(&mut hasher);
    let hash = hasher.finish();
    let dir = base.join("flowdash").join("font-cache");
    Some((
        dir.join(format!("{hash:x}.font")),
        dir.join(format!("{hash:x}.meta")),
    ))
}

fn store_cached_face(family_key: &str, data: &[u8], index: u32) {
    let Some((font_path, meta_path)) = cache_paths(family_key) else {
        return;
    };
    if font_path.exists() {
        return;
    }
    if let Some(parent) = font_path.parent() {
        let _ = fs::create_dir_all(parent);
    }
    let _ = fs::write(&font_path, data);
    let _ = fs::write(&meta_path, index.to_string());
}

fn load_cached_face(family_key: &str) -> Option<FontAdvances> {
    let (font_path, meta_path) = cache_paths(family_key)?;
    if !font_path.exists() || !meta_path.exists() {
        return None;
    }
    let bytes = fs::read(font_path).ok()?;
    let index: u32 = fs::read_to_string(meta_path).ok()?.trim().parse().ok()?;
    FontAdvances::parse(bytes, index)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn heuristic_measure_is_deterministic() {
        let measure = HeuristicMeasure;
        let a = measure.text_width("Staging", 12.0).unwrap();
        let b = measure.text_width("Staging", 12.0).unwrap();
        assert_eq!(a, b);
        assert!(a > 0.0);
        assert_eq!(measure.text_width("", 12.0), Some(0.0));
    }

    #[test]
    fn empty_text_needs_no_font() {
        assert_eq!(measure_text_width("", 12.0, "no-such-font"), Some(0.0));
    }

    #[test]
    fn measurer_follows_fast_metrics_flag() {
        let config = LayoutConfig::default();
        let measure = measurer_for(&config);
        assert_eq!(
            measure.text_width("abc", 10.0),
            HeuristicMeasure.text_width("abc", 10.0)
        );
    }
}
