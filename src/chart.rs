use std::f64::consts::PI;
use std::fs;
use std::io::Cursor;
use std::path::Path;

use image::{DynamicImage, ImageFormat, Rgba, RgbaImage};
use serde::Deserialize;

use crate::accumulator::Totals;
use crate::error::ChartError;

pub const CHART_FILE_NAME: &str = "weekly-chart.png";

const TRANSPARENT: Rgba<u8> = Rgba([0, 0, 0, 0]);
const EMPTY_RING: Rgba<u8> = Rgba([0xdd, 0xdd, 0xdd, 0xff]);
const LABEL: Rgba<u8> = Rgba([0x33, 0x33, 0x33, 0xff]);

// Slice colors for members missing from the palette, cycled by slice position.
const FALLBACK_COLORS: [Rgba<u8>; 6] = [
    Rgba([0x8e, 0xca, 0xe6, 0xff]),
    Rgba([0xff, 0xb7, 0x03, 0xff]),
    Rgba([0x90, 0xbe, 0x6d, 0xff]),
    Rgba([0xf2, 0x84, 0x82, 0xff]),
    Rgba([0xb3, 0x9c, 0xd0, 0xff]),
    Rgba([0x6d, 0x9d, 0xc5, 0xff]),
];

/// Height of the swatch strip under the donut.
const LEGEND_HEIGHT: u32 = 20;
const SWATCH: u32 = 10;
const SWATCH_GAP: u32 = 4;
/// Arc width, in pixels, of the gap drawn between neighbouring slices.
const SEPARATOR: f64 = 2.0;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Slice {
    pub label: String,
    pub value: u64,
    pub color: Rgba<u8>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ChartRequest {
    pub slices: Vec<Slice>,
    pub center_label: String,
}

impl ChartRequest {
    /// One slice per member in totals order, labelled with this command's minutes.
    pub fn from_totals(weekly: &Totals, palette: &MemberPalette, total_minutes: u64) -> Self {
        let slices = weekly
            .iter()
            .enumerate()
            .map(|(i, (name, minutes))| Slice {
                label: name.clone(),
                value: *minutes,
                color: palette
                    .color_for(name)
                    .unwrap_or(FALLBACK_COLORS[i % FALLBACK_COLORS.len()]),
            })
            .collect();
        Self {
            slices,
            center_label: format!("{total_minutes}분"),
        }
    }
}

/// Chart-rendering collaborator: request in, encoded image out.
pub trait ChartRenderer: Send + Sync {
    fn render(&self, req: &ChartRequest) -> Result<Vec<u8>, ChartError>;
}

#[derive(Deserialize)]
struct MemberColor {
    name: String,
    color: String,
}

/// Member name -> slice color, from `member_color_list.json`.
#[derive(Clone, Debug, Default)]
pub struct MemberPalette {
    colors: Vec<(String, Rgba<u8>)>,
}

impl MemberPalette {
    pub fn load(data_dir: &Path) -> Self {
        let path = data_dir.join("member_color_list.json");
        let parsed = fs::read_to_string(&path)
            .map_err(|e| e.to_string())
            .and_then(|raw| {
                serde_json::from_str::<Vec<MemberColor>>(&raw).map_err(|e| e.to_string())
            });
        match parsed {
            Ok(list) => Self {
                colors: list
                    .into_iter()
                    .filter_map(|m| {
                        let color = parse_hex(&m.color);
                        if color.is_none() {
                            tracing::debug!(member = %m.name, color = %m.color, "ignoring malformed member color");
                        }
                        Some((m.name, color?))
                    })
                    .collect(),
            },
            Err(e) => {
                tracing::debug!(error = %e, path = %path.display(), "member palette unavailable");
                Self::default()
            }
        }
    }

    pub fn color_for(&self, name: &str) -> Option<Rgba<u8>> {
        self.colors
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, c)| *c)
    }
}

fn parse_hex(s: &str) -> Option<Rgba<u8>> {
    let hex = s.trim().strip_prefix('#')?;
    if hex.len() != 6 || !hex.is_ascii() {
        return None;
    }
    let channel = |i: usize| u8::from_str_radix(&hex[i..i + 2], 16).ok();
    Some(Rgba([channel(0)?, channel(2)?, channel(4)?, 0xff]))
}

/// Draws a donut chart as PNG on a transparent canvas. Slices run clockwise
/// from 12 o'clock, the center label sits inside the hole, and a strip of
/// color swatches under the donut lists the members in slice order.
pub struct DonutRenderer {
    width: u32,
    height: u32,
}

impl Default for DonutRenderer {
    fn default() -> Self {
        Self::new(220, 220 + LEGEND_HEIGHT)
    }
}

impl DonutRenderer {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }
}

impl ChartRenderer for DonutRenderer {
    fn render(&self, req: &ChartRequest) -> Result<Vec<u8>, ChartError> {
        let (w, h) = (self.width, self.height);
        let donut_h = h.saturating_sub(LEGEND_HEIGHT);
        let outer = f64::from(w.min(donut_h)) / 2.0 - 10.0;
        if outer <= 0.0 {
            return Err(ChartError::Canvas {
                width: w,
                height: h,
            });
        }
        let inner = outer * 0.55;
        let (cx, cy) = (f64::from(w) / 2.0, f64::from(donut_h) / 2.0);

        let total: u64 = req.slices.iter().map(|s| s.value).sum();
        let mut bounds = Vec::with_capacity(req.slices.len());
        let mut acc = 0u64;
        for s in &req.slices {
            acc += s.value;
            bounds.push((acc as f64 / total.max(1) as f64, s.color));
        }
        // Edges between visible slices; a lone slice draws as a closed ring.
        let visible = req.slices.iter().filter(|s| s.value > 0).count();
        let edges: Vec<f64> = if visible > 1 {
            req.slices
                .iter()
                .zip(&bounds)
                .filter(|(s, _)| s.value > 0)
                .map(|(_, (end, _))| *end)
                .collect()
        } else {
            Vec::new()
        };

        let mut img = RgbaImage::from_pixel(w, h, TRANSPARENT);
        for (x, y, px) in img.enumerate_pixels_mut() {
            let dx = f64::from(x) + 0.5 - cx;
            let dy = f64::from(y) + 0.5 - cy;
            let r = dx.hypot(dy);
            if r < inner || r > outer {
                continue;
            }
            if total == 0 {
                *px = EMPTY_RING;
                continue;
            }
            let mut theta = dx.atan2(-dy);
            if theta < 0.0 {
                theta += 2.0 * PI;
            }
            let frac = theta / (2.0 * PI);
            let on_edge = edges.iter().any(|e| {
                let d = (frac - e).abs();
                d.min(1.0 - d) * 2.0 * PI * r < SEPARATOR / 2.0
            });
            if on_edge {
                continue;
            }
            if let Some((_, color)) = bounds.iter().find(|(end, _)| frac < *end) {
                *px = *color;
            } else if let Some((_, color)) = bounds.last() {
                *px = *color;
            }
        }

        draw_label(&mut img, &req.center_label, cx, cy, inner * 2.0 * 0.8);
        draw_legend(&mut img, &req.slices, donut_h);

        let mut buf = Cursor::new(Vec::new());
        DynamicImage::ImageRgba8(img).write_to(&mut buf, ImageFormat::Png)?;
        Ok(buf.into_inner())
    }
}

/// Bitmap glyph, one row per entry, high bit on the left.
struct Glyph {
    width: u32,
    rows: &'static [u8],
}

static DIGITS: [Glyph; 10] = [
    Glyph { width: 3, rows: &[0b111, 0b101, 0b101, 0b101, 0b111] },
    Glyph { width: 3, rows: &[0b010, 0b110, 0b010, 0b010, 0b111] },
    Glyph { width: 3, rows: &[0b111, 0b001, 0b111, 0b100, 0b111] },
    Glyph { width: 3, rows: &[0b111, 0b001, 0b111, 0b001, 0b111] },
    Glyph { width: 3, rows: &[0b101, 0b101, 0b111, 0b001, 0b001] },
    Glyph { width: 3, rows: &[0b111, 0b100, 0b111, 0b001, 0b111] },
    Glyph { width: 3, rows: &[0b111, 0b100, 0b111, 0b101, 0b111] },
    Glyph { width: 3, rows: &[0b111, 0b001, 0b001, 0b001, 0b001] },
    Glyph { width: 3, rows: &[0b111, 0b101, 0b111, 0b101, 0b111] },
    Glyph { width: 3, rows: &[0b111, 0b101, 0b111, 0b001, 0b111] },
];

// 분: ㅂ over ㅜ over ㄴ.
static MINUTE: Glyph = Glyph {
    width: 5,
    rows: &[
        0b10001, 0b11111, 0b10001, 0b11111, 0b00000, 0b11111, 0b00100, 0b10000, 0b11111,
    ],
};

fn glyph_for(c: char) -> Option<&'static Glyph> {
    match c {
        '분' => Some(&MINUTE),
        _ => c.to_digit(10).map(|d| &DIGITS[d as usize]),
    }
}

fn draw_label(img: &mut RgbaImage, label: &str, cx: f64, cy: f64, max_width: f64) {
    let glyphs: Vec<&Glyph> = label.chars().filter_map(glyph_for).collect();
    if glyphs.is_empty() {
        return;
    }
    // One empty cell between glyphs; shorter glyphs sit on the baseline.
    let cells: u32 = glyphs.iter().map(|g| g.width).sum::<u32>() + glyphs.len() as u32 - 1;
    let tallest = glyphs.iter().map(|g| g.rows.len() as u32).max().unwrap_or(0);
    let scale = (max_width / f64::from(cells)).floor().clamp(1.0, 4.0) as u32;
    let text_w = cells * scale;
    let text_h = tallest * scale;
    let x0 = (cx - f64::from(text_w) / 2.0).max(0.0) as u32;
    let y0 = (cy - f64::from(text_h) / 2.0).max(0.0) as u32;

    let mut gx = x0;
    for g in glyphs {
        let gy = y0 + (tallest - g.rows.len() as u32) * scale;
        for (row, bits) in g.rows.iter().enumerate() {
            for col in 0..g.width {
                if bits & (1 << (g.width - 1 - col)) == 0 {
                    continue;
                }
                fill(
                    img,
                    gx + col * scale,
                    gy + row as u32 * scale,
                    scale,
                    scale,
                    LABEL,
                );
            }
        }
        gx += (g.width + 1) * scale;
    }
}

fn draw_legend(img: &mut RgbaImage, slices: &[Slice], top: u32) {
    let step = SWATCH + SWATCH_GAP;
    let fits = ((img.width() + SWATCH_GAP) / step) as usize;
    let shown = slices.len().min(fits);
    if shown == 0 {
        return;
    }
    let row_w = shown as u32 * step - SWATCH_GAP;
    let x0 = (img.width() - row_w) / 2;
    let y0 = top + LEGEND_HEIGHT.saturating_sub(SWATCH) / 2;
    for (i, s) in slices.iter().take(shown).enumerate() {
        fill(img, x0 + i as u32 * step, y0, SWATCH, SWATCH, s.color);
    }
}

fn fill(img: &mut RgbaImage, x: u32, y: u32, w: u32, h: u32, color: Rgba<u8>) {
    for py in y..y.saturating_add(h).min(img.height()) {
        for px in x..x.saturating_add(w).min(img.width()) {
            img.put_pixel(px, py, color);
        }
    }
}


#[cfg(test)]
mod tests {
    use tempfile::TempDir;

    use super::*;

    const RED: Rgba<u8> = Rgba([0xff, 0, 0, 0xff]);
    const BLUE: Rgba<u8> = Rgba([0, 0, 0xff, 0xff]);

    fn request(values: &[(u64, Rgba<u8>)], label: &str) -> ChartRequest {
        ChartRequest {
            slices: values
                .iter()
                .enumerate()
                .map(|(i, (v, c))| Slice {
                    label: format!("m{i}"),
                    value: *v,
                    color: *c,
                })
                .collect(),
            center_label: label.to_string(),
        }
    }

    fn decode(png: &[u8]) -> RgbaImage {
        image::load_from_memory_with_format(png, ImageFormat::Png)
            .unwrap()
            .to_rgba8()
    }

    fn draw(req: &ChartRequest) -> RgbaImage {
        decode(&DonutRenderer::default().render(req).unwrap())
    }

    #[test]
    fn renders_png_with_legend_strip() {
        let png = DonutRenderer::default()
            .render(&request(&[(50, RED), (20, BLUE)], "70분"))
            .unwrap();
        assert_eq!(&png[..4], b"\x89PNG");
        assert_eq!(decode(&png).dimensions(), (220, 240));
    }

    #[test]
    fn slices_run_clockwise_from_top() {
        let img = draw(&request(&[(50, RED), (50, BLUE)], ""));
        // Ring midpoint is at radius ~77 from (110, 110).
        assert_eq!(*img.get_pixel(187, 110), RED);
        assert_eq!(*img.get_pixel(33, 110), BLUE);
        assert_eq!(*img.get_pixel(110, 110), TRANSPARENT);
        assert_eq!(*img.get_pixel(2, 2), TRANSPARENT);
    }

    #[test]
    fn neighbouring_slices_are_separated() {
        let img = draw(&request(&[(50, RED), (50, BLUE)], ""));
        assert_eq!(*img.get_pixel(110, 33), TRANSPARENT);
        assert_eq!(*img.get_pixel(110, 187), TRANSPARENT);

        let whole = draw(&request(&[(50, RED)], ""));
        assert_eq!(*whole.get_pixel(110, 33), RED);
    }

    #[test]
    fn zero_totals_draw_an_empty_ring() {
        let img = draw(&request(&[(0, RED)], "0분"));
        assert_eq!(*img.get_pixel(187, 110), EMPTY_RING);
    }

    #[test]
    fn center_label_draws_digits() {
        let img = draw(&request(&[(1, RED)], "8"));
        // "8" lights 13 of its 15 cells, each 4x4 at this size.
        let label_pixels = img.pixels().filter(|p| **p == LABEL).count();
        assert_eq!(label_pixels, 13 * 16);
    }

    #[test]
    fn center_label_draws_the_minute_unit() {
        let img = draw(&request(&[(1, RED)], "8분"));
        let label_pixels = img.pixels().filter(|p| **p == LABEL).count();
        assert_eq!(label_pixels, (13 + 26) * 16);
    }

    #[test]
    fn legend_lists_slice_colors_in_order() {
        let img = draw(&request(&[(50, RED), (20, BLUE)], ""));
        // Two 10px swatches with a 4px gap, centered under the donut.
        assert_eq!(*img.get_pixel(103, 230), RED);
        assert_eq!(*img.get_pixel(117, 230), BLUE);
        assert_eq!(*img.get_pixel(90, 230), TRANSPARENT);
    }

    #[test]
    fn zero_sized_canvas_is_an_error() {
        let err = DonutRenderer::new(0, 0).render(&request(&[(1, RED)], "1분"));
        assert!(matches!(err, Err(ChartError::Canvas { .. })));
    }

    #[test]
    fn palette_maps_known_members_only() {
        let dir = TempDir::new().unwrap();
        fs::write(
            dir.path().join("member_color_list.json"),
            r##"[{"name": "민수", "color": "#FF8800"}, {"name": "영지", "color": "bogus"}]"##,
        )
        .unwrap();
        let palette = MemberPalette::load(dir.path());
        assert_eq!(palette.color_for("민수"), Some(Rgba([0xff, 0x88, 0x00, 0xff])));
        assert_eq!(palette.color_for("영지"), None);
        assert_eq!(palette.color_for("없음"), None);
    }

    #[test]
    fn members_missing_from_palette_stay_visible() {
        let dir = TempDir::new().unwrap();
        let palette = MemberPalette::load(dir.path());
        let mut weekly = Totals::new();
        weekly.insert("민수".to_string(), 50);
        weekly.insert("영지".to_string(), 50);
        let req = ChartRequest::from_totals(&weekly, &palette, 100);

        let (a, b) = (req.slices[0].color, req.slices[1].color);
        assert_ne!(a, b);
        let img = draw(&req);
        assert_eq!(*img.get_pixel(187, 110), a);
        assert_eq!(*img.get_pixel(33, 110), b);
        assert_ne!(*img.get_pixel(187, 110), *img.get_pixel(2, 2));
    }

    #[test]
    fn request_follows_totals_order() {
        let mut weekly = Totals::new();
        weekly.insert("민수".to_string(), 50);
        weekly.insert("영지".to_string(), 20);
        let req = ChartRequest::from_totals(&weekly, &MemberPalette::default(), 70);
        let labels: Vec<&str> = req.slices.iter().map(|s| s.label.as_str()).collect();
        assert_eq!(labels, ["민수", "영지"]);
        assert_eq!(req.center_label, "70분");
    }
}
