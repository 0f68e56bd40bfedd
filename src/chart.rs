//! Horizontal bar-chart rendering, split into a pure layout pass and a thin
//! drawing pass so the geometry is testable without a graphical surface.

/// Logical-pixel constants, scaled by the device pixel ratio at layout time.
const PAD: f64 = 16.0;
const BAR_HEIGHT: f64 = 16.0;
const GAP: f64 = 10.0;
const BAR_FONT: f64 = 12.0;
const EMPTY_FONT: f64 = 14.0;

pub const MAX_BARS: usize = 10;
pub const EMPTY_MESSAGE: &str = "No data yet.";

pub const TRACK_STYLE: &str = "rgba(255,255,255,0.07)";
pub const FILL_STYLE: &str = "rgba(37,99,235,0.85)";
pub const TEXT_STYLE: &str = "rgba(255,255,255,0.88)";
pub const MUTED_STYLE: &str = "rgba(255,255,255,0.6)";

#[derive(Debug, Clone, PartialEq)]
pub struct SeriesItem {
    pub label: String,
    pub value: f64,
}

impl SeriesItem {
    pub fn new(label: impl Into<String>, value: f64) -> Self {
        Self { label: label.into(), value }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Bar {
    pub x: f64,
    pub y: f64,
    pub height: f64,
    pub track_width: f64,
    pub fill_width: f64,
    pub label: String,
    pub value_text: String,
}

/// Geometry for one draw. For a fixed series, dimensions and pixel ratio the
/// layout is exactly reproducible.
#[derive(Debug, Clone, PartialEq)]
pub struct ChartLayout {
    /// Pixel-buffer dimensions: displayed size scaled by the pixel ratio.
    pub width: f64,
    pub height: f64,
    pub dpr: f64,
    pub pad: f64,
    pub font_px: f64,
    pub bars: Vec<Bar>,
    pub empty_message: Option<String>,
}

pub fn layout(logical_width: f64, logical_height: f64, dpr: f64, items: &[SeriesItem]) -> ChartLayout {
    let dpr = if dpr > 0.0 { dpr } else { 1.0 };
    let width = logical_width * dpr;
    let height = logical_height * dpr;

    if items.is_empty() {
        return ChartLayout {
            width,
            height,
            dpr,
            pad: PAD * dpr,
            font_px: EMPTY_FONT * dpr,
            bars: Vec::new(),
            empty_message: Some(EMPTY_MESSAGE.to_string()),
        };
    }

    let top = &items[..items.len().min(MAX_BARS)];
    let pad = PAD * dpr;
    let bar_h = BAR_HEIGHT * dpr;
    let gap = GAP * dpr;

    let max = top
        .iter()
        .map(|it| if it.value.is_finite() { it.value } else { 0.0 })
        .fold(f64::MIN, f64::max);
    // Zero max would divide every fill to NaN; one keeps the tracks empty.
    let max = if max == 0.0 { 1.0 } else { max };

    let track_width = width - pad * 2.0;
    let bars = top
        .iter()
        .enumerate()
        .map(|(i, it)| {
            let v = if it.value.is_finite() { it.value } else { 0.0 };
            Bar {
                x: pad,
                y: pad + i as f64 * (bar_h + gap),
                height: bar_h,
                track_width,
                fill_width: track_width * (v / max),
                label: it.label.clone(),
                value_text: format!("{:.1}", v),
            }
        })
        .collect();

    ChartLayout {
        width,
        height,
        dpr,
        pad,
        font_px: BAR_FONT * dpr,
        bars,
        empty_message: None,
    }
}

/// Minimal 2D drawing surface. Text y-coordinates are vertically centered on
/// the given position, matching a canvas with a middle text baseline.
pub trait Surface {
    fn resize(&mut self, width: f64, height: f64);
    fn clear(&mut self);
    fn fill_rect(&mut self, x: f64, y: f64, w: f64, h: f64, style: &str);
    fn fill_text(&mut self, text: &str, x: f64, y: f64, size_px: f64, style: &str);
    fn measure_text(&self, text: &str, size_px: f64) -> f64;
}

/// Replays a layout onto a surface. Resizing and clearing happen on every
/// draw so the buffer stays pixel-crisp after container resizes.
pub fn render(surface: &mut dyn Surface, chart: &ChartLayout) {
    surface.resize(chart.width, chart.height);
    surface.clear();

    if let Some(msg) = &chart.empty_message {
        surface.fill_text(msg, 20.0 * chart.dpr, 40.0 * chart.dpr, chart.font_px, MUTED_STYLE);
        return;
    }

    for bar in &chart.bars {
        surface.fill_rect(bar.x, bar.y, bar.track_width, bar.height, TRACK_STYLE);
        surface.fill_rect(bar.x, bar.y, bar.fill_width, bar.height, FILL_STYLE);

        let mid = bar.y + bar.height / 2.0;
        surface.fill_text(&bar.label, bar.x, mid, chart.font_px, TEXT_STYLE);
        let tw = surface.measure_text(&bar.value_text, chart.font_px);
        surface.fill_text(&bar.value_text, chart.width - chart.pad - tw, mid, chart.font_px, TEXT_STYLE);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn series(pairs: &[(&str, f64)]) -> Vec<SeriesItem> {
        pairs.iter().map(|(l, v)| SeriesItem::new(*l, *v)).collect()
    }

    #[derive(Debug, PartialEq)]
    enum Op {
        Resize(f64, f64),
        Clear,
        Rect(f64, f64, f64, f64, String),
        Text(String, f64, f64, String),
    }

    #[derive(Default)]
    struct RecordingSurface {
        ops: Vec<Op>,
    }

    impl Surface for RecordingSurface {
        fn resize(&mut self, width: f64, height: f64) {
            self.ops.push(Op::Resize(width, height));
        }
        fn clear(&mut self) {
            self.ops.push(Op::Clear);
        }
        fn fill_rect(&mut self, x: f64, y: f64, w: f64, h: f64, style: &str) {
            self.ops.push(Op::Rect(x, y, w, h, style.to_string()));
        }
        fn fill_text(&mut self, text: &str, x: f64, y: f64, _size_px: f64, style: &str) {
            self.ops.push(Op::Text(text.to_string(), x, y, style.to_string()));
        }
        fn measure_text(&self, text: &str, size_px: f64) -> f64 {
            // Fixed-advance approximation, good enough for geometry checks.
            text.chars().count() as f64 * size_px * 0.6
        }
    }

    #[test]
    fn test_fill_width_proportional_to_max() {
        let items = series(&[("a", 50.0), ("b", 25.0)]);
        let chart = layout(400.0, 200.0, 1.0, &items);

        assert_eq!(chart.bars.len(), 2);
        let a = &chart.bars[0];
        let b = &chart.bars[1];
        // a carries the max, so it spans the full track; b is exactly half.
        assert_eq!(a.fill_width, a.track_width);
        assert_eq!(a.fill_width, b.fill_width * 2.0);
    }

    #[test]
    fn test_vertical_positions() {
        let items = series(&[("a", 1.0), ("b", 2.0), ("c", 3.0)]);
        let chart = layout(400.0, 200.0, 1.0, &items);

        for (i, bar) in chart.bars.iter().enumerate() {
            assert_eq!(bar.y, 16.0 + i as f64 * (16.0 + 10.0));
            assert_eq!(bar.height, 16.0);
        }
    }

    #[test]
    fn test_dpr_scales_buffer_and_geometry() {
        let items = series(&[("a", 10.0)]);
        let one = layout(300.0, 150.0, 1.0, &items);
        let two = layout(300.0, 150.0, 2.0, &items);

        assert_eq!(two.width, 600.0);
        assert_eq!(two.height, 300.0);
        assert_eq!(two.pad, one.pad * 2.0);
        assert_eq!(two.bars[0].track_width, 600.0 - 2.0 * 32.0);
    }

    #[test]
    fn test_empty_series_yields_message_and_no_bars() {
        let chart = layout(400.0, 200.0, 2.0, &[]);
        assert!(chart.bars.is_empty());
        assert_eq!(chart.empty_message.as_deref(), Some(EMPTY_MESSAGE));

        let mut surface = RecordingSurface::default();
        render(&mut surface, &chart);
        assert_eq!(surface.ops[0], Op::Resize(800.0, 400.0));
        assert_eq!(surface.ops[1], Op::Clear);
        assert!(matches!(&surface.ops[2], Op::Text(msg, x, y, _) if msg == EMPTY_MESSAGE && *x == 40.0 && *y == 80.0));
        assert!(!surface.ops.iter().any(|op| matches!(op, Op::Rect(..))));
    }

    #[test]
    fn test_zero_max_substitutes_one() {
        let items = series(&[("a", 0.0), ("b", 0.0)]);
        let chart = layout(400.0, 200.0, 1.0, &items);
        for bar in &chart.bars {
            assert_eq!(bar.fill_width, 0.0);
        }
    }

    #[test]
    fn test_truncates_to_max_bars() {
        let items: Vec<SeriesItem> =
            (0..25).map(|i| SeriesItem::new(format!("f{}", i), i as f64)).collect();
        let chart = layout(400.0, 600.0, 1.0, &items);
        assert_eq!(chart.bars.len(), MAX_BARS);
        assert_eq!(chart.bars[0].label, "f0");
    }

    #[test]
    fn test_layout_is_deterministic() {
        let items = series(&[("alpha", 42.5), ("beta", 13.37)]);
        let a = layout(512.0, 256.0, 1.5, &items);
        let b = layout(512.0, 256.0, 1.5, &items);
        assert_eq!(a, b);
    }

    #[test]
    fn test_value_text_one_decimal() {
        let items = series(&[("a", 33.333)]);
        let chart = layout(400.0, 200.0, 1.0, &items);
        assert_eq!(chart.bars[0].value_text, "33.3");
    }

    #[test]
    fn test_render_draws_track_fill_label_value_per_bar() {
        let items = series(&[("a", 50.0), ("b", 25.0)]);
        let chart = layout(400.0, 200.0, 1.0, &items);
        let mut surface = RecordingSurface::default();
        render(&mut surface, &chart);

        let rects: Vec<_> = surface
            .ops
            .iter()
            .filter(|op| matches!(op, Op::Rect(..)))
            .collect();
        assert_eq!(rects.len(), 4); // track + fill per bar

        let texts: Vec<_> = surface
            .ops
            .iter()
            .filter_map(|op| match op {
                Op::Text(t, x, ..) => Some((t.clone(), *x)),
                _ => None,
            })
            .collect();
        assert_eq!(texts.len(), 4); // label + value per bar
        assert_eq!(texts[0].0, "a");
        // Value text right-aligned inside the padded area.
        let (value_text, value_x) = &texts[1];
        assert_eq!(value_text, "50.0");
        let tw = value_text.chars().count() as f64 * chart.font_px * 0.6;
        assert_eq!(*value_x, chart.width - chart.pad - tw);
    }
}
