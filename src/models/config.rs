//! Watermark configuration
//!
//! `WatermarkOptions` is the partial, serde-friendly shape handed over from
//! JavaScript. `WatermarkConfig` is the merged per-instance value; it is never
//! mutated by rendering. `RenderParams` is the ratio-scaled view of a config,
//! derived afresh for every render.

use serde::Deserialize;
use uuid::Uuid;

/// Prefix of generated overlay ids
pub const ID_PREFIX: &str = "x-watermark";

/// Lowest alpha that still shows up on screen
pub const MIN_EFFECTIVE_ALPHA: f64 = 0.005;

// ============================================================================
// Dimensions and tiling mode
// ============================================================================

/// Raw width/height as it arrives from JavaScript: `90`, `"90"` or `"auto"`
#[derive(Deserialize, Clone, Debug, PartialEq)]
#[serde(untagged)]
pub enum DimensionValue {
    Number(f64),
    Text(String),
}

/// Declared width or height of one tile
#[derive(Clone, Debug, PartialEq)]
pub enum Dimension {
    /// Computed from the measured text and rotation
    Auto,
    /// Logical pixels before `ratio` scaling
    Fixed(f64),
    /// Neither numeric nor "auto"; rejected when the tile is rendered
    Invalid(String),
}

impl Dimension {
    /// Parse a string the way a numeric coercion would: blank is zero
    pub fn parse(raw: &str) -> Self {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Dimension::Fixed(0.0);
        }
        if trimmed == "auto" {
            return Dimension::Auto;
        }
        match trimmed.parse::<f64>() {
            Ok(value) if value.is_finite() => Dimension::Fixed(value),
            _ => Dimension::Invalid(raw.to_string()),
        }
    }

    fn scaled(&self, ratio: f64) -> Self {
        match self {
            Dimension::Fixed(value) => Dimension::Fixed(value * ratio),
            other => other.clone(),
        }
    }
}

impl From<DimensionValue> for Dimension {
    fn from(value: DimensionValue) -> Self {
        match value {
            DimensionValue::Number(n) if n.is_finite() => Dimension::Fixed(n),
            DimensionValue::Number(n) => Dimension::Invalid(n.to_string()),
            DimensionValue::Text(s) => Dimension::parse(&s),
        }
    }
}

/// How the tile repeats across the region
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum TileMode {
    #[default]
    Normal,
    Horizontal,
    Vertical,
    Stagger,
}

impl TileMode {
    /// Accepts the long names and their one-letter aliases.
    /// Anything unrecognized tiles like `Normal`.
    pub fn from_alias(mode: &str) -> Self {
        match mode.trim().to_ascii_lowercase().as_str() {
            "horizontal" | "h" | "x" => TileMode::Horizontal,
            "vertical" | "v" | "y" => TileMode::Vertical,
            "stagger" | "s" => TileMode::Stagger,
            _ => TileMode::Normal,
        }
    }
}

// ============================================================================
// Regions
// ============================================================================

/// Where the overlay goes (or what gets observed), resolved against the host
#[derive(Clone, Debug, PartialEq)]
pub enum RegionRef<R> {
    /// The root surface (document body)
    Root,
    Selector(String),
    Node(R),
}

impl<R> RegionRef<R> {
    pub fn describe(&self) -> String {
        match self {
            RegionRef::Root => "<root>".to_string(),
            RegionRef::Selector(selector) => selector.clone(),
            RegionRef::Node(_) => "<element>".to_string(),
        }
    }
}

// ============================================================================
// Config records
// ============================================================================

#[derive(Clone, Copy, Debug, PartialEq, Default)]
pub struct Offset {
    pub top: f64,
    pub left: f64,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Spacing {
    pub x: f64,
    pub y: f64,
}

#[derive(Clone, Debug, PartialEq)]
pub struct FontSpec {
    pub family: String,
    pub weight: String,
    pub size: f64,
}

impl FontSpec {
    /// CSS shorthand, e.g. `normal 16px Helvetica Neue, Arial`
    pub fn css(&self) -> String {
        format!("{} {}px {}", self.weight, self.size, self.family)
    }

    /// Distance between two wrapped lines
    pub fn line_height(&self) -> f64 {
        self.size * 1.5
    }
}

/// Options object as passed in from JavaScript. Everything is optional.
#[derive(Deserialize, Clone, Debug, Default, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct WatermarkOptions {
    pub id: Option<String>,
    pub top: Option<f64>,
    pub left: Option<f64>,
    pub x_space: Option<f64>,
    pub y_space: Option<f64>,
    pub ratio: Option<f64>,
    pub font: Option<String>,
    pub weight: Option<String>,
    pub color: Option<String>,
    pub fontsize: Option<f64>,
    pub alpha: Option<f64>,
    pub angle: Option<f64>,
    pub z_index: Option<i32>,
    pub width: Option<DimensionValue>,
    pub height: Option<DimensionValue>,
    pub mode: Option<String>,
    #[serde(alias = "parentSelector")]
    pub target_selector: Option<String>,
    pub observe_selector: Option<String>,
    #[serde(alias = "observeRegion")]
    pub observer: Option<bool>,
    #[serde(alias = "tamperGuard")]
    pub prevent: Option<bool>,
}

/// Merged per-instance configuration
#[derive(Clone, Debug, PartialEq)]
pub struct WatermarkConfig<R> {
    pub id: String,
    pub offset: Offset,
    pub spacing: Spacing,
    pub ratio: f64,
    pub font: FontSpec,
    pub color: String,
    pub alpha: f64,
    pub angle: f64,
    pub z_index: i32,
    pub width: Dimension,
    pub height: Dimension,
    pub mode: TileMode,
    pub target: RegionRef<R>,
    pub observe_region: bool,
    /// Defaults to `target` when unset
    pub observe_target: Option<RegionRef<R>>,
    pub tamper_guard: bool,
}

/// A fresh unique overlay id
pub fn generate_id() -> String {
    format!("{}-{}", ID_PREFIX, Uuid::new_v4().simple())
}

impl<R> Default for WatermarkConfig<R> {
    fn default() -> Self {
        Self {
            id: generate_id(),
            offset: Offset { top: 0.0, left: 0.0 },
            spacing: Spacing { x: 50.0, y: 50.0 },
            ratio: 1.0,
            font: FontSpec {
                family: "Helvetica Neue, Arial, sans-serif".to_string(),
                weight: "normal".to_string(),
                size: 16.0,
            },
            color: "black".to_string(),
            alpha: 0.1,
            angle: -15.0,
            z_index: 9999,
            width: Dimension::Auto,
            height: Dimension::Auto,
            mode: TileMode::Normal,
            target: RegionRef::Root,
            observe_region: false,
            observe_target: None,
            tamper_guard: false,
        }
    }
}

impl<R> WatermarkConfig<R> {
    /// Merge options over the defaults
    pub fn from_options(options: WatermarkOptions) -> Self {
        let defaults = Self::default();

        let target = match options.target_selector.filter(|s| !s.trim().is_empty()) {
            Some(selector) => RegionRef::Selector(selector),
            None => defaults.target,
        };
        let observe_target = options
            .observe_selector
            .filter(|s| !s.trim().is_empty())
            .map(RegionRef::Selector);

        Self {
            id: options.id.filter(|id| !id.is_empty()).unwrap_or(defaults.id),
            offset: Offset {
                top: options.top.unwrap_or(defaults.offset.top),
                left: options.left.unwrap_or(defaults.offset.left),
            },
            spacing: Spacing {
                x: options.x_space.unwrap_or(defaults.spacing.x),
                y: options.y_space.unwrap_or(defaults.spacing.y),
            },
            ratio: options.ratio.unwrap_or(defaults.ratio),
            font: FontSpec {
                family: options.font.unwrap_or(defaults.font.family),
                weight: options.weight.unwrap_or(defaults.font.weight),
                size: options.fontsize.unwrap_or(defaults.font.size),
            },
            color: options.color.unwrap_or(defaults.color),
            alpha: options.alpha.unwrap_or(defaults.alpha),
            angle: options.angle.unwrap_or(defaults.angle),
            z_index: options.z_index.unwrap_or(defaults.z_index),
            width: options.width.map(Dimension::from).unwrap_or(defaults.width),
            height: options.height.map(Dimension::from).unwrap_or(defaults.height),
            mode: options
                .mode
                .as_deref()
                .map(TileMode::from_alias)
                .unwrap_or(defaults.mode),
            target,
            observe_region: options.observer.unwrap_or(defaults.observe_region),
            observe_target,
            tamper_guard: options.prevent.unwrap_or(defaults.tamper_guard),
        }
    }

    pub fn with_target(mut self, target: RegionRef<R>) -> Self {
        self.target = target;
        self
    }

    pub fn with_observe_target(mut self, target: RegionRef<R>) -> Self {
        self.observe_target = Some(target);
        self
    }

    /// Scale offsets, spacing, font size and fixed dimensions by `ratio`.
    /// Always starts from the unscaled values, so repeated renders agree.
    pub fn render_params(&self) -> RenderParams {
        let ratio = self.ratio;
        RenderParams {
            offset: Offset {
                top: self.offset.top * ratio,
                left: self.offset.left * ratio,
            },
            spacing: Spacing {
                x: self.spacing.x * ratio,
                y: self.spacing.y * ratio,
            },
            font: FontSpec {
                size: self.font.size * ratio,
                ..self.font.clone()
            },
            color: self.color.clone(),
            alpha: self.alpha,
            angle: self.angle,
            z_index: self.z_index,
            width: self.width.scaled(ratio),
            height: self.height.scaled(ratio),
            mode: self.mode,
        }
    }
}

/// Everything one render needs, already scaled by `ratio`
#[derive(Clone, Debug, PartialEq)]
pub struct RenderParams {
    pub offset: Offset,
    pub spacing: Spacing,
    pub font: FontSpec,
    pub color: String,
    pub alpha: f64,
    pub angle: f64,
    pub z_index: i32,
    pub width: Dimension,
    pub height: Dimension,
    pub mode: TileMode,
}

impl RenderParams {
    /// Stagger tiles are laid out with doubled spacing
    pub fn effective_spacing(&self) -> Spacing {
        match self.mode {
            TileMode::Stagger => Spacing {
                x: self.spacing.x * 2.0,
                y: self.spacing.y * 2.0,
            },
            _ => self.spacing,
        }
    }
}
