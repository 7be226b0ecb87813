//! Named colormaps and value-to-color normalisation.
//!
//! Colormaps are defined by hex color stops and expanded to a 256-entry
//! lookup table. A `_r` suffix reverses any map; `.rgb` suffixes are
//! optional so `cet_rainbow` and `cet_rainbow.rgb` name the same map.

use std::collections::HashMap;

use diags_common::{DiagsError, DiagsResult};
use once_cell::sync::Lazy;

/// Lookup table size used for every colormap.
pub const LUT_SIZE: usize = 256;

static COLORMAP_STOPS: Lazy<HashMap<&'static str, &'static [&'static str]>> =
    Lazy::new(|| {
        let mut map: HashMap<&'static str, &'static [&'static str]> = HashMap::new();
        map.insert(
            "cet_rainbow.rgb",
            &[
                "#0034f9", "#1b5bf0", "#2a7dd6", "#2f97b4", "#3aa88c", "#5bb463", "#86bd43",
                "#b2c22b", "#d9c01f", "#f3aa1c", "#fb8419", "#f65a18", "#e92b1d",
            ],
        );
        map.insert(
            "diverging_bwr.rgb",
            &[
                "#053061", "#2166ac", "#4393c3", "#92c5de", "#d1e5f0", "#f7f7f7", "#fddbc7",
                "#f4a582", "#d6604d", "#b2182b", "#67001f",
            ],
        );
        map.insert(
            "WhiteBlueGreenYellowRed.rgb",
            &[
                "#ffffff", "#d2ecfa", "#8ccdf0", "#4a9fe0", "#2f7fc1", "#30a37a", "#5fbf3f",
                "#c3d92b", "#f6e52a", "#f8a01f", "#e8501a", "#b01515",
            ],
        );
        map.insert(
            "viridis",
            &[
                "#440154", "#482878", "#3e4989", "#31688e", "#26828e", "#1f9e89", "#35b779",
                "#6ece58", "#b5de2b", "#fde725",
            ],
        );
        map.insert(
            "jet",
            &[
                "#00007f", "#0000ff", "#007fff", "#00ffff", "#7fff7f", "#ffff00", "#ff7f00",
                "#ff0000", "#7f0000",
            ],
        );
        map.insert("bwr", &["#0000ff", "#ffffff", "#ff0000"]);
        map.insert(
            "RdBu",
            &[
                "#67001f", "#b2182b", "#d6604d", "#f4a582", "#fddbc7", "#f7f7f7", "#d1e5f0",
                "#92c5de", "#4393c3", "#2166ac", "#053061",
            ],
        );
        map.insert(
            "BrBG",
            &[
                "#543005", "#8c510a", "#bf812d", "#dfc27d", "#f6e8c3", "#f5f5f5", "#c7eae5",
                "#80cdc1", "#35978f", "#01665e", "#003c30",
            ],
        );
        map.insert(
            "PiYG",
            &[
                "#8e0152", "#c51b7d", "#de77ae", "#f1b6da", "#fde0ef", "#f7f7f7", "#e6f5d0",
                "#b8e186", "#7fbc41", "#4d9221", "#276419",
            ],
        );
        map
    });

/// Parse hex color string to RGB
pub fn hex_to_rgb(hex: &str) -> Option<(u8, u8, u8)> {
    let hex = hex.trim_start_matches('#');
    if hex.len() != 6 {
        return None;
    }

    let r = u8::from_str_radix(&hex[0..2], 16).ok()?;
    let g = u8::from_str_radix(&hex[2..4], 16).ok()?;
    let b = u8::from_str_radix(&hex[4..6], 16).ok()?;

    Some((r, g, b))
}

/// A colormap expanded to [`LUT_SIZE`] colors.
#[derive(Debug, Clone, PartialEq)]
pub struct Colormap {
    name: String,
    lut: Vec<[u8; 3]>,
}

impl Colormap {
    /// Look up a colormap by name.
    pub fn by_name(name: &str) -> DiagsResult<Self> {
        let (base, reversed) = match name.strip_suffix("_r") {
            Some(base) => (base, true),
            None => (name, false),
        };
        let stops = find_stops(base)
            .ok_or_else(|| DiagsError::UnknownColormap(name.to_string()))?;
        let mut colors: Vec<(u8, u8, u8)> = stops
            .iter()
            .map(|hex| {
                hex_to_rgb(hex).ok_or_else(|| {
                    DiagsError::RenderError(format!("bad color '{}' in colormap {}", hex, base))
                })
            })
            .collect::<DiagsResult<_>>()?;
        if reversed {
            colors.reverse();
        }

        Ok(Self {
            name: name.to_string(),
            lut: expand(&colors, LUT_SIZE),
        })
    }

    /// Names of the built-in colormaps (without `_r` variants).
    pub fn names() -> Vec<&'static str> {
        let mut names: Vec<&'static str> = COLORMAP_STOPS.keys().copied().collect();
        names.sort_unstable();
        names
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn len(&self) -> usize {
        self.lut.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lut.is_empty()
    }

    /// Color at a lookup-table index, clamped to the table.
    pub fn color(&self, index: usize) -> [u8; 3] {
        self.lut[index.min(self.lut.len() - 1)]
    }

    /// Color at a position in `[0, 1]` (clamped).
    pub fn sample(&self, t: f64) -> [u8; 3] {
        let t = if t.is_nan() { 0.0 } else { t.clamp(0.0, 1.0) };
        self.color((t * (self.lut.len() - 1) as f64).round() as usize)
    }
}

fn find_stops(name: &str) -> Option<&'static [&'static str]> {
    if let Some(stops) = COLORMAP_STOPS.get(name) {
        return Some(*stops);
    }
    match name.strip_suffix(".rgb") {
        Some(bare) => COLORMAP_STOPS.get(bare).copied(),
        None => COLORMAP_STOPS.get(format!("{}.rgb", name).as_str()).copied(),
    }
}

/// Linearly interpolate `stops` into `n` evenly spaced colors.
fn expand(stops: &[(u8, u8, u8)], n: usize) -> Vec<[u8; 3]> {
    if stops.len() == 1 {
        let (r, g, b) = stops[0];
        return vec![[r, g, b]; n];
    }
    let segments = (stops.len() - 1) as f64;
    (0..n)
        .map(|i| {
            let pos = i as f64 / (n - 1) as f64 * segments;
            let k = (pos.floor() as usize).min(stops.len() - 2);
            let t = pos - k as f64;
            let (a, b) = (stops[k], stops[k + 1]);
            let lerp = |x: u8, y: u8| (x as f64 + (y as f64 - x as f64) * t).round() as u8;
            [lerp(a.0, b.0), lerp(a.1, b.1), lerp(a.2, b.2)]
        })
        .collect()
}

/// Maps data values to colormap lookup indices.
#[derive(Debug, Clone, PartialEq)]
pub enum Norm {
    /// Discrete bins between consecutive boundaries, spread over `ncolors`.
    Boundary { boundaries: Vec<f64>, ncolors: usize },
    /// Linear scaling of `[vmin, vmax]` onto `ncolors`.
    Linear { vmin: f64, vmax: f64, ncolors: usize },
}

impl Norm {
    pub fn boundary(boundaries: Vec<f64>, ncolors: usize) -> DiagsResult<Self> {
        if boundaries.len() < 2 {
            return Err(DiagsError::InvalidLevels(format!(
                "a boundary norm needs at least 2 boundaries, got {}",
                boundaries.len()
            )));
        }
        if boundaries.windows(2).any(|w| w[1] < w[0]) {
            return Err(DiagsError::InvalidLevels(format!(
                "boundaries must be non-decreasing: {:?}",
                boundaries
            )));
        }
        Ok(Norm::Boundary {
            boundaries,
            ncolors,
        })
    }

    pub fn linear(vmin: f64, vmax: f64, ncolors: usize) -> Self {
        Norm::Linear {
            vmin,
            vmax,
            ncolors,
        }
    }

    /// Number of discrete bins (boundary norm) or colors (linear norm).
    pub fn n_regions(&self) -> usize {
        match self {
            Norm::Boundary { boundaries, .. } => boundaries.len() - 1,
            Norm::Linear { ncolors, .. } => *ncolors,
        }
    }

    /// Lookup index for `value`; `None` for NaN. Out-of-range values take
    /// the first or last color.
    pub fn index(&self, value: f64) -> Option<usize> {
        if value.is_nan() {
            return None;
        }
        match self {
            Norm::Boundary {
                boundaries,
                ncolors,
            } => {
                let below = boundaries.iter().filter(|&&b| b <= value).count();
                if below == 0 {
                    return Some(0);
                }
                let region = below - 1;
                if region >= self.n_regions() {
                    return Some(ncolors - 1);
                }
                Some(self.region_index(region))
            }
            Norm::Linear {
                vmin,
                vmax,
                ncolors,
            } => {
                if vmax <= vmin {
                    return Some(0);
                }
                let t = ((value - vmin) / (vmax - vmin)).clamp(0.0, 1.0);
                Some(((t * *ncolors as f64) as usize).min(ncolors - 1))
            }
        }
    }

    /// Lookup index used for bin `region` of a boundary norm.
    pub fn region_index(&self, region: usize) -> usize {
        match self {
            Norm::Boundary { ncolors, .. } => {
                let n_regions = self.n_regions();
                if *ncolors <= n_regions {
                    return region.min(ncolors - 1);
                }
                if n_regions == 1 {
                    return (ncolors - 1) / 2;
                }
                ((*ncolors - 1) as f64 / (n_regions - 1) as f64 * region as f64) as usize
            }
            Norm::Linear { ncolors, .. } => region.min(ncolors - 1),
        }
    }
}
