use std::collections::BTreeMap;

use super::Color;

/// Behavior for sample positions outside `[0, 1]`.
#[derive(Debug, Copy, Clone, Default, Eq, PartialEq)]
pub enum SpreadMode {
    /// Clamp to the edge stops.
    #[default]
    Pad,
    /// Repeat the palette.
    Repeat,
    /// Mirror-repeat the palette.
    Reflect,
}

impl SpreadMode {
    fn fold(self, t: f32) -> f32 {
        match self {
            SpreadMode::Pad => t.clamp(0.0, 1.0),
            SpreadMode::Repeat => t.rem_euclid(1.0),
            SpreadMode::Reflect => {
                let r = t.rem_euclid(2.0);
                if r > 1.0 { 2.0 - r } else { r }
            }
        }
    }
}

/// A single palette stop at position `t`.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct ColorStop {
    pub t: f32,
    pub color: Color,
}

impl ColorStop {
    #[inline]
    pub const fn new(t: f32, color: Color) -> Self {
        Self { t, color }
    }
}

/// Piecewise-linear color ramp.
///
/// Stops are sorted by `t` at construction. Sampling between two stops
/// interpolates linearly; sampling outside the stop range follows `spread`.
#[derive(Debug, Clone, PartialEq)]
pub struct Palette {
    stops: Vec<ColorStop>,
    spread: SpreadMode,
}

impl Palette {
    pub fn new(mut stops: Vec<ColorStop>) -> Self {
        stops.retain(|s| s.t.is_finite() && s.color.is_finite());
        stops.sort_by(|a, b| a.t.total_cmp(&b.t));
        Self { stops, spread: SpreadMode::Pad }
    }

    /// Evenly spaced stops from first to last color.
    pub fn uniform(colors: &[Color]) -> Self {
        let n = colors.len();
        let stops = colors
            .iter()
            .enumerate()
            .map(|(i, &c)| {
                let t = if n > 1 { i as f32 / (n - 1) as f32 } else { 0.0 };
                ColorStop::new(t, c)
            })
            .collect();
        Self::new(stops)
    }

    pub fn with_spread(mut self, spread: SpreadMode) -> Self {
        self.spread = spread;
        self
    }

    #[inline]
    pub fn stops(&self) -> &[ColorStop] {
        &self.stops
    }

    /// Color at position `t`. NaN samples and empty palettes are transparent.
    pub fn sample(&self, t: f32) -> Color {
        let (Some(first), Some(last)) = (self.stops.first(), self.stops.last()) else {
            return Color::TRANSPARENT;
        };
        if t.is_nan() {
            return Color::TRANSPARENT;
        }
        let t = self.spread.fold(t);
        if t <= first.t {
            return first.color;
        }
        if t >= last.t {
            return last.color;
        }
        let i = self.stops.partition_point(|s| s.t <= t);
        let (lo, hi) = (self.stops[i - 1], self.stops[i]);
        let span = hi.t - lo.t;
        if span <= 0.0 {
            return hi.color;
        }
        lo.color.lerp(hi.color, (t - lo.t) / span)
    }
}

/// Named palettes available to colormap transforms.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct PaletteRegistry {
    palettes: BTreeMap<String, Palette>,
}

impl PaletteRegistry {
    /// An empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry preloaded with the built-in palettes.
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        for (name, palette) in builtins() {
            registry.insert(name, palette);
        }
        registry
    }

    /// Registers `palette` under `name`, replacing any previous entry.
    pub fn insert(&mut self, name: impl Into<String>, palette: Palette) {
        self.palettes.insert(name.into(), palette);
    }

    pub fn get(&self, name: &str) -> Option<&Palette> {
        self.palettes.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.palettes.contains_key(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.palettes.keys().map(String::as_str)
    }
}

fn ramp(points: &[[f32; 3]]) -> Palette {
    let colors: Vec<Color> = points.iter().map(|&[r, g, b]| Color::rgb(r, g, b)).collect();
    Palette::uniform(&colors)
}

fn builtins() -> Vec<(&'static str, Palette)> {
    let gray = Palette::uniform(&[Color::BLACK, Color::WHITE]);
    vec![
        ("gray", gray.clone()),
        ("grey", gray),
        ("binary", Palette::uniform(&[Color::WHITE, Color::BLACK])),
        (
            "hot",
            Palette::new(vec![
                ColorStop::new(0.0, Color::rgb(0.0416, 0.0, 0.0)),
                ColorStop::new(0.365, Color::rgb(1.0, 0.0, 0.0)),
                ColorStop::new(0.746, Color::rgb(1.0, 1.0, 0.0)),
                ColorStop::new(1.0, Color::WHITE),
            ]),
        ),
        (
            "viridis",
            ramp(&[
                [0.267, 0.005, 0.329],
                [0.229, 0.322, 0.546],
                [0.128, 0.567, 0.551],
                [0.369, 0.789, 0.383],
                [0.993, 0.906, 0.144],
            ]),
        ),
        (
            "plasma",
            ramp(&[
                [0.050, 0.030, 0.528],
                [0.494, 0.012, 0.658],
                [0.798, 0.280, 0.470],
                [0.973, 0.585, 0.254],
                [0.940, 0.975, 0.131],
            ]),
        ),
        (
            "inferno",
            ramp(&[
                [0.001, 0.000, 0.014],
                [0.341, 0.062, 0.429],
                [0.735, 0.216, 0.330],
                [0.978, 0.557, 0.035],
                [0.988, 0.998, 0.645],
            ]),
        ),
        (
            "magma",
            ramp(&[
                [0.001, 0.000, 0.014],
                [0.317, 0.071, 0.485],
                [0.716, 0.215, 0.475],
                [0.987, 0.535, 0.382],
                [0.987, 0.991, 0.750],
            ]),
        ),
        (
            "coolwarm",
            ramp(&[[0.230, 0.299, 0.754], [0.865, 0.865, 0.865], [0.706, 0.016, 0.150]]),
        ),
    ]
}
