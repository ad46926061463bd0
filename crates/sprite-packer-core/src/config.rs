use serde::{Deserialize, Serialize};
use std::str::FromStr;

use crate::error::{PackError, Result};

/// How an atlas grows when no free rectangle admits the next sprite.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ExpandStrategy {
    /// Grow width and height together.
    ExpandBoth,
    ExpandWidth,
    ExpandHeight,
    /// Grow whichever axis is currently smaller (height on ties).
    ExpandShortSide,
    /// Grow whichever axis is currently larger (width on ties).
    ExpandLongSide,
}

impl FromStr for ExpandStrategy {
    type Err = ();
    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "both" | "expand_both" => Ok(Self::ExpandBoth),
            "width" | "expand_width" => Ok(Self::ExpandWidth),
            "height" | "expand_height" => Ok(Self::ExpandHeight),
            "short" | "short_side" | "expand_short_side" => Ok(Self::ExpandShortSide),
            "long" | "long_side" | "expand_long_side" => Ok(Self::ExpandLongSide),
            _ => Err(()),
        }
    }
}

/// Free-rectangle ranking heuristics. Lower rank wins.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum RankStrategy {
    /// Leftover along the candidate's longer side.
    BestShortSideFit,
    /// Leftover along the candidate's shorter side.
    BestLongSideFit,
    /// Leftover area.
    BestAreaFit,
}

impl FromStr for RankStrategy {
    type Err = ();
    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "bssf" | "bestshortsidefit" => Ok(Self::BestShortSideFit),
            "blsf" | "bestlongsidefit" => Ok(Self::BestLongSideFit),
            "baf" | "bestareafit" => Ok(Self::BestAreaFit),
            _ => Err(()),
        }
    }
}

/// Settings for one packing run. Consumed read-only by every stage.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PackSettings {
    /// Hard ceiling on atlas width in pixels.
    pub max_width: u32,
    /// Hard ceiling on atlas height in pixels.
    pub max_height: u32,
    /// Pixels reserved around the whole atlas.
    pub border_padding: u32,
    /// Pixels reserved between neighbouring sprites.
    pub shape_padding: u32,
    /// Grow both axes together.
    pub force_square: bool,
    /// Grow by doubling instead of a fixed step.
    pub force_pot: bool,

    /// Resample factor applied before trimming. `1.0` disables scaling.
    pub scale: f64,
    /// Pixels with alpha below this are cleared before trimming. `0` disables trimming.
    pub trim_alpha_threshold: u8,
    /// Edge pixels repeated around every sprite. `0` disables extrusion.
    pub extrude_size: u32,
    /// Bleed edge colours into transparent pixels of the composited atlas.
    pub reduce_border_artifacts: bool,
    #[serde(default = "default_bleed_iterations")]
    pub bleed_iterations: u32,

    /// Atlas file stem with one integer placeholder (`%d`, `%02d`, `{}`).
    pub output_naming_pattern: String,
    /// Atlas image extension, e.g. `png`.
    pub output_format: String,

    #[serde(default = "default_expand_strategy")]
    pub expand_strategy: ExpandStrategy,
    #[serde(default = "default_rank_strategy")]
    pub rank_strategy: RankStrategy,
    /// Let the allocator try 90° rotated placements.
    #[serde(default)]
    pub allow_rotation: bool,
}

pub const DEFAULT_ATLAS_SIZE: u32 = 4096;

impl Default for PackSettings {
    fn default() -> Self {
        Self {
            max_width: DEFAULT_ATLAS_SIZE,
            max_height: DEFAULT_ATLAS_SIZE,
            border_padding: 0,
            shape_padding: 2,
            force_square: false,
            force_pot: false,
            scale: 1.0,
            trim_alpha_threshold: 0,
            extrude_size: 0,
            reduce_border_artifacts: false,
            bleed_iterations: default_bleed_iterations(),
            output_naming_pattern: "atlas_%02d".into(),
            output_format: "png".into(),
            expand_strategy: default_expand_strategy(),
            rank_strategy: default_rank_strategy(),
            allow_rotation: false,
        }
    }
}

fn default_bleed_iterations() -> u32 {
    4
}
fn default_expand_strategy() -> ExpandStrategy {
    ExpandStrategy::ExpandShortSide
}
fn default_rank_strategy() -> RankStrategy {
    RankStrategy::BestAreaFit
}

impl PackSettings {
    /// Validates the settings.
    ///
    /// Returns an error if:
    /// - a maximum dimension is zero or does not fit `i32`
    /// - border padding leaves no usable interior
    /// - `scale` is not a positive finite number
    /// - the naming pattern lacks exactly one integer placeholder
    pub fn validate(&self) -> Result<()> {
        if self.max_width == 0 || self.max_height == 0 {
            return Err(PackError::InvalidDimensions {
                width: self.max_width,
                height: self.max_height,
            });
        }
        if self.max_width > i32::MAX as u32 || self.max_height > i32::MAX as u32 {
            return Err(PackError::InvalidConfig(format!(
                "atlas dimensions {}x{} exceed {}",
                self.max_width,
                self.max_height,
                i32::MAX
            )));
        }
        let total_border = self.border_padding.saturating_mul(2);
        if total_border >= self.max_width || total_border >= self.max_height {
            return Err(PackError::InvalidConfig(format!(
                "border_padding ({}) * 2 leaves no room in {}x{}",
                self.border_padding, self.max_width, self.max_height
            )));
        }
        if self.shape_padding > i32::MAX as u32 || self.extrude_size > i32::MAX as u32 {
            return Err(PackError::InvalidConfig(
                "shape_padding/extrude_size out of range".into(),
            ));
        }
        if !self.scale.is_finite() || self.scale <= 0.0 {
            return Err(PackError::InvalidConfig(format!(
                "scale must be a positive number, got {}",
                self.scale
            )));
        }
        parse_placeholder(&self.output_naming_pattern)?;
        Ok(())
    }

    /// Trimming runs only for a non-zero threshold.
    pub fn trim_enabled(&self) -> bool {
        self.trim_alpha_threshold > 0
    }

    /// Atlas name for the atlas at `index`, e.g. `atlas_03`.
    pub fn atlas_name(&self, index: usize) -> Result<String> {
        let ph = parse_placeholder(&self.output_naming_pattern)?;
        let pattern = &self.output_naming_pattern;
        let digits = match (ph.zero_pad, ph.width) {
            (true, w) => format!("{:0w$}", index, w = w),
            (false, w) => format!("{:w$}", index, w = w),
        };
        Ok(format!(
            "{}{}{}",
            pattern[..ph.start].replace("%%", "%"),
            digits,
            pattern[ph.end..].replace("%%", "%")
        ))
    }

    /// Atlas image file name, e.g. `atlas_03.png`.
    pub fn atlas_file_name(&self, index: usize) -> Result<String> {
        Ok(format!("{}.{}", self.atlas_name(index)?, self.output_format))
    }

    /// Create a fluent builder for `PackSettings`.
    pub fn builder() -> PackSettingsBuilder {
        PackSettingsBuilder::new()
    }
}

struct Placeholder {
    start: usize,
    end: usize,
    zero_pad: bool,
    width: usize,
}

/// Locates the single integer placeholder of a naming pattern.
/// Accepts printf style (`%d`, `%3d`, `%02d`) and `{}`; `%%` is a literal percent sign.
fn parse_placeholder(pattern: &str) -> Result<Placeholder> {
    let bytes = pattern.as_bytes();
    let mut found: Option<Placeholder> = None;
    let mut i = 0;
    while i < bytes.len() {
        let ph = match bytes[i] {
            b'%' if bytes.get(i + 1) == Some(&b'%') => {
                i += 2;
                continue;
            }
            b'%' => {
                let mut j = i + 1;
                let zero_pad = bytes.get(j) == Some(&b'0');
                while j < bytes.len() && bytes[j].is_ascii_digit() {
                    j += 1;
                }
                if bytes.get(j) != Some(&b'd') {
                    return Err(PackError::InvalidConfig(format!(
                        "unsupported placeholder in naming pattern '{pattern}'"
                    )));
                }
                let width = pattern[i + 1..j].parse::<usize>().unwrap_or(0);
                Placeholder {
                    start: i,
                    end: j + 1,
                    zero_pad,
                    width,
                }
            }
            b'{' if bytes.get(i + 1) == Some(&b'}') => Placeholder {
                start: i,
                end: i + 2,
                zero_pad: false,
                width: 0,
            },
            _ => {
                i += 1;
                continue;
            }
        };
        if found.is_some() {
            return Err(PackError::InvalidConfig(format!(
                "naming pattern '{pattern}' has more than one placeholder"
            )));
        }
        i = ph.end;
        found = Some(ph);
    }
    found.ok_or_else(|| {
        PackError::InvalidConfig(format!(
            "naming pattern '{pattern}' needs an integer placeholder"
        ))
    })
}

/// Builder for `PackSettings` for ergonomic construction.
#[derive(Debug, Default, Clone)]
pub struct PackSettingsBuilder {
    settings: PackSettings,
}

impl PackSettingsBuilder {
    pub fn new() -> Self {
        Self {
            settings: PackSettings::default(),
        }
    }
    pub fn with_max_dimensions(mut self, w: u32, h: u32) -> Self {
        self.settings.max_width = w;
        self.settings.max_height = h;
        self
    }
    pub fn border_padding(mut self, v: u32) -> Self {
        self.settings.border_padding = v;
        self
    }
    pub fn shape_padding(mut self, v: u32) -> Self {
        self.settings.shape_padding = v;
        self
    }
    pub fn force_square(mut self, v: bool) -> Self {
        self.settings.force_square = v;
        self
    }
    pub fn force_pot(mut self, v: bool) -> Self {
        self.settings.force_pot = v;
        self
    }
    pub fn scale(mut self, v: f64) -> Self {
        self.settings.scale = v;
        self
    }
    pub fn trim_alpha_threshold(mut self, v: u8) -> Self {
        self.settings.trim_alpha_threshold = v;
        self
    }
    pub fn extrude_size(mut self, v: u32) -> Self {
        self.settings.extrude_size = v;
        self
    }
    pub fn reduce_border_artifacts(mut self, v: bool) -> Self {
        self.settings.reduce_border_artifacts = v;
        self
    }
    pub fn bleed_iterations(mut self, v: u32) -> Self {
        self.settings.bleed_iterations = v;
        self
    }
    pub fn output_naming_pattern(mut self, v: impl Into<String>) -> Self {
        self.settings.output_naming_pattern = v.into();
        self
    }
    pub fn output_format(mut self, v: impl Into<String>) -> Self {
        self.settings.output_format = v.into();
        self
    }
    pub fn expand_strategy(mut self, v: ExpandStrategy) -> Self {
        self.settings.expand_strategy = v;
        self
    }
    pub fn rank_strategy(mut self, v: RankStrategy) -> Self {
        self.settings.rank_strategy = v;
        self
    }
    pub fn allow_rotation(mut self, v: bool) -> Self {
        self.settings.allow_rotation = v;
        self
    }
    pub fn build(self) -> PackSettings {
        self.settings
    }
}
