use std::collections::BTreeMap;
use std::fmt;
use std::fs;
use std::path::Path;
use std::time::Instant;

use anyhow::{Context, Result};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use regex::Regex;
use tracing::{info, warn};

use crate::error::GroupingError;
use crate::rows::GroupId;

// Include default palette at compile time
const DEFAULT_PALETTE_BYTES: &[u8] = include_bytes!("../default_group_palette.txt");
const PALETTE_FILE_NAME: &str = "group_palette.txt";

/// 24-bit fill color.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RgbColor(u32);

impl RgbColor {
    pub fn new(rgb: u32) -> Self {
        Self(rgb & 0xFF_FFFF)
    }

    pub fn rgb(self) -> u32 {
        self.0
    }
}

impl fmt::Display for RgbColor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{:06X}", self.0)
    }
}

/// Where group colors come from.
#[derive(Debug, Clone, PartialEq)]
pub enum ColorScheme {
    /// Group `n` takes palette entry `n - 1`, wrapping around.
    Palette(Vec<RgbColor>),
    /// One random color per group, reproducible from the seed.
    Seeded(u64),
}

impl ColorScheme {
    /// Assigns a color to every id in `groups`, visiting ids in ascending order.
    pub fn assign<I>(&self, groups: I) -> Result<BTreeMap<GroupId, RgbColor>, GroupingError>
    where
        I: IntoIterator<Item = GroupId>,
    {
        let mut ids: Vec<GroupId> = groups.into_iter().collect();
        ids.sort_unstable();
        ids.dedup();

        match self {
            ColorScheme::Palette(palette) => {
                if palette.is_empty() {
                    return Err(GroupingError::EmptyPalette);
                }
                Ok(ids
                    .into_iter()
                    .map(|id| {
                        let slot = (id.get() as usize).saturating_sub(1) % palette.len();
                        (id, palette[slot])
                    })
                    .collect())
            }
            ColorScheme::Seeded(seed) => {
                let mut rng = StdRng::seed_from_u64(*seed);
                Ok(ids
                    .into_iter()
                    .map(|id| (id, RgbColor::new(rng.gen_range(0..=0xFF_FFFF))))
                    .collect())
            }
        }
    }
}

const COLOR_PATTERN: &str = r"^#?([0-9A-Fa-f]{6})$";

/// Parses palette text. Non-color lines starting with `#` are comments.
///
/// With `strict`, any other unparseable line is an error; otherwise it is logged and skipped.
pub fn parse_palette(content: &str, strict: bool) -> Result<Vec<RgbColor>, GroupingError> {
    let pattern = Regex::new(COLOR_PATTERN)?;
    let mut colors = Vec::new();

    for (line_num, line) in content.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        if let Some(hex) = pattern.captures(line).and_then(|c| c.get(1)) {
            if let Ok(rgb) = u32::from_str_radix(hex.as_str(), 16) {
                colors.push(RgbColor::new(rgb));
                continue;
            }
        }
        if line.starts_with('#') {
            continue;
        }
        if strict {
            return Err(GroupingError::InvalidColor {
                line: line_num + 1,
                value: line.to_string(),
            });
        }
        warn!(action = "parse", component = "palette_line", line_number = line_num + 1, value = line, "Invalid palette color");
    }
    Ok(colors)
}

pub fn load_palette(palette_file_path: Option<&Path>) -> Result<Vec<RgbColor>> {
    let start_time = Instant::now();
    info!(
        action = "start",
        component = "palette_loading",
        "Starting group palette loading"
    );

    let mut palette = Vec::new();

    if let Some(path) = palette_file_path {
        info!(action = "load", component = "palette_file", file_path = ?path, "Loading palette from specified file");
        if !path.exists() {
            anyhow::bail!("Palette file not found: {:?}", path);
        }

        let content = fs::read_to_string(path)?;
        palette = parse_palette(&content, true)
            .with_context(|| format!("Invalid palette file {:?}", path))?;
        if palette.is_empty() {
            return Err(GroupingError::EmptyPalette)
                .with_context(|| format!("No colors in {:?}", path));
        }
        info!(action = "loaded", component = "palette_file", color_count = palette.len(), file_path = ?path, "Loaded palette from file");
    } else {
        // Try default file
        let default_file = Path::new(PALETTE_FILE_NAME);
        if default_file.exists() {
            info!(action = "load", component = "default_palette_file", file_path = ?default_file, "Loading palette from default file");
            let content = fs::read_to_string(default_file)?;
            palette = parse_palette(&content, false)?;
            info!(action = "loaded", component = "default_palette_file", color_count = palette.len(), file_path = ?default_file, "Loaded palette from default file");
        }

        if palette.is_empty() {
            info!(
                action = "load",
                component = "embedded_palette",
                "Using embedded default palette"
            );
            palette = parse_palette(embedded_palette()?, false)?;
        }
    }

    info!(
        action = "complete",
        component = "palette_loading",
        color_count = palette.len(),
        duration_ms = start_time.elapsed().as_millis(),
        "Palette ready"
    );
    Ok(palette)
}

fn embedded_palette() -> Result<&'static str> {
    std::str::from_utf8(DEFAULT_PALETTE_BYTES).context("Failed to decode embedded default palette")
}

/// Writes the embedded palette to `group_palette.txt` in `dir`, refusing to overwrite.
pub fn init_default_palette(dir: &Path) -> Result<()> {
    let default_file = dir.join(PALETTE_FILE_NAME);

    if default_file.exists() {
        anyhow::bail!(
            "{} already exists. Remove it first if you want to reinitialize.",
            PALETTE_FILE_NAME
        );
    }

    fs::write(&default_file, embedded_palette()?)?;
    println!("Created {} with default colors", default_file.display());

    Ok(())
}
