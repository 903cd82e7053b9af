use std::fmt;

use thiserror::Error;

use crate::palette::ColorTable;

/// Fill used for any colour token the palette does not know.
pub const FALLBACK_GRAY: &str = "#808080";

const FALLBACK_RGB: [u8; 3] = [0x80, 0x80, 0x80];

/// Keywords announcing a marbled (multi-colour) route, compared after normalization.
const MARBLED_KEYWORDS: &[&str] = &["MARBREE", "MARBLES", "MARBLED"];

/// Labels on fills darker than this get white text.
const DARK_LUMINANCE_THRESHOLD: f64 = 0.5;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ColorError {
    #[error("invalid colour format '{0}': expected #RRGGBB")]
    InvalidColorFormat(String),
}

/// A validated `#rrggbb` colour. Displays in lowercase canonical form.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FillColor {
    rgb: [u8; 3],
}

impl FillColor {
    pub fn parse(value: &str) -> Result<Self, ColorError> {
        let (r, g, b) = parse_hex_rgb(value)?;
        Ok(Self { rgb: [r, g, b] })
    }

    pub const fn from_rgb(r: u8, g: u8, b: u8) -> Self {
        Self { rgb: [r, g, b] }
    }

    pub const fn fallback() -> Self {
        Self { rgb: FALLBACK_RGB }
    }

    pub fn luminance(&self) -> f64 {
        let [r, g, b] = self.rgb;
        weighted_luminance(r, g, b)
    }
}

impl fmt::Display for FillColor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let [r, g, b] = self.rgb;
        write!(f, "#{r:02x}{g:02x}{b:02x}")
    }
}

/// How a route is painted: one flat colour, or a marbled gradient in stop order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Fill {
    Solid(FillColor),
    Gradient(Vec<FillColor>),
}

impl Fill {
    /// `None` for an empty list; a single colour never becomes a gradient.
    pub fn from_colors(mut colors: Vec<FillColor>) -> Option<Self> {
        match colors.len() {
            0 => None,
            1 => colors.pop().map(Fill::Solid),
            _ => Some(Fill::Gradient(colors)),
        }
    }

    pub fn colors(&self) -> &[FillColor] {
        match self {
            Fill::Solid(color) => std::slice::from_ref(color),
            Fill::Gradient(colors) => colors,
        }
    }

    pub fn is_gradient(&self) -> bool {
        matches!(self, Fill::Gradient(_))
    }

    /// Gradients always take white labels; stops are not inspected.
    pub fn label_color(&self) -> LabelColor {
        match self {
            Fill::Solid(color) => LabelColor::for_luminance(color.luminance()),
            Fill::Gradient(_) => LabelColor::White,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LabelColor {
    Black,
    White,
}

impl LabelColor {
    pub fn for_luminance(luminance: f64) -> Self {
        if luminance < DARK_LUMINANCE_THRESHOLD {
            LabelColor::White
        } else {
            LabelColor::Black
        }
    }

    pub fn as_svg(self) -> &'static str {
        match self {
            LabelColor::Black => "black",
            LabelColor::White => "white",
        }
    }
}

/// Perceived brightness of a `#rrggbb` string in `[0, 1]`.
pub fn luminance(hex: &str) -> Result<f64, ColorError> {
    let (r, g, b) = parse_hex_rgb(hex)?;
    Ok(weighted_luminance(r, g, b))
}

pub fn label_color_for_hex(hex: &str) -> Result<LabelColor, ColorError> {
    luminance(hex).map(LabelColor::for_luminance)
}

fn weighted_luminance(r: u8, g: u8, b: u8) -> f64 {
    (0.299 * f64::from(r) + 0.587 * f64::from(g) + 0.114 * f64::from(b)) / 255.0
}

fn parse_hex_rgb(value: &str) -> Result<(u8, u8, u8), ColorError> {
    let invalid = || ColorError::InvalidColorFormat(value.to_string());
    let hex = value.strip_prefix('#').ok_or_else(invalid)?;
    if hex.len() != 6 || !hex.bytes().all(|b| b.is_ascii_hexdigit()) {
        return Err(invalid());
    }

    let channel = |range: std::ops::Range<usize>| {
        u8::from_str_radix(&hex[range], 16).map_err(|_| invalid())
    };
    Ok((channel(0..2)?, channel(2..4)?, channel(4..6)?))
}

/// Canonical lookup key for a colour name: trimmed, uppercased, French
/// accents folded, inner whitespace collapsed to single spaces.
pub fn normalize_name(token: &str) -> String {
    token
        .split_whitespace()
        .map(|word| {
            word.chars()
                .flat_map(char::to_uppercase)
                .map(fold_accent)
                .collect::<String>()
        })
        .collect::<Vec<_>>()
        .join(" ")
}

fn fold_accent(c: char) -> char {
    match c {
        'À' | 'Â' | 'Ä' => 'A',
        'É' | 'È' | 'Ê' | 'Ë' => 'E',
        'Î' | 'Ï' => 'I',
        'Ô' | 'Ö' => 'O',
        'Ù' | 'Û' | 'Ü' => 'U',
        'Ç' => 'C',
        'Ÿ' => 'Y',
        other => other,
    }
}

/// A colour name that was not in the palette and was replaced by gray.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColorWarning {
    pub token: String,
}

impl fmt::Display for ColorWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "colour '{}' not found, defaulting to gray {FALLBACK_GRAY}",
            self.token
        )
    }
}

/// Colours for one token plus the names that had to fall back.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolution {
    pub colors: Vec<FillColor>,
    pub warnings: Vec<ColorWarning>,
}

impl Resolution {
    pub fn fill(&self) -> Fill {
        Fill::from_colors(self.colors.clone()).unwrap_or(Fill::Solid(FillColor::fallback()))
    }
}

pub struct ColorResolver<'a> {
    table: &'a ColorTable,
}

impl<'a> ColorResolver<'a> {
    pub fn new(table: &'a ColorTable) -> Self {
        Self { table }
    }

    /// Resolves a raw `Couleur` cell. Never returns an empty colour list.
    pub fn resolve(&self, token: &str) -> Resolution {
        let trimmed = token.trim();
        if let Ok(color) = FillColor::parse(trimmed) {
            return Resolution {
                colors: vec![color],
                warnings: Vec::new(),
            };
        }

        let normalized = normalize_name(trimmed);
        let mut warnings = Vec::new();
        let colors = match marbled_components(&normalized) {
            Some(parts) => parts
                .into_iter()
                .map(|part| self.lookup(part, &mut warnings))
                .collect(),
            None => vec![self.lookup(&normalized, &mut warnings)],
        };

        Resolution { colors, warnings }
    }

    fn lookup(&self, name: &str, warnings: &mut Vec<ColorWarning>) -> FillColor {
        if let Ok(color) = FillColor::parse(name) {
            return color;
        }
        match self.table.get(name) {
            Some(color) => *color,
            None => {
                warnings.push(ColorWarning {
                    token: name.to_string(),
                });
                FillColor::fallback()
            }
        }
    }
}

/// Sub-tokens of `KEYWORD (a / b / ...)`, or `None` when no keyword is present.
/// Without parentheses, everything after the keyword is split instead.
fn marbled_components(normalized: &str) -> Option<Vec<&str>> {
    let (at, len) = MARBLED_KEYWORDS
        .iter()
        .filter_map(|keyword| normalized.find(keyword).map(|at| (at, keyword.len())))
        .min()?;

    let rest = &normalized[at + len..];
    let inner = match rest.rfind('(') {
        Some(open) => {
            let after = &rest[open + 1..];
            after.split(')').next().unwrap_or(after)
        }
        None => rest,
    };

    Some(inner.split('/').map(str::trim).collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn resolve(token: &str) -> Resolution {
        let table = ColorTable::default();
        ColorResolver::new(&table).resolve(token)
    }

    fn hexes(resolution: &Resolution) -> Vec<String> {
        resolution.colors.iter().map(ToString::to_string).collect()
    }

    #[test]
    fn resolves_named_colours_through_the_palette() {
        assert_eq!(hexes(&resolve("BLEUE")), ["#0000ff"]);
        assert_eq!(hexes(&resolve("blue")), ["#0000ff"]);
        assert_eq!(hexes(&resolve("  Jaune   Fluo ")), ["#f0ff21"]);
        assert!(resolve("BLEUE").warnings.is_empty());
    }

    #[test]
    fn every_palette_name_resolves_to_its_entry() {
        let table = ColorTable::default();
        let resolver = ColorResolver::new(&table);
        for (name, color) in table.iter() {
            let resolution = resolver.resolve(name);
            assert_eq!(resolution.colors, vec![*color], "name {name}");
            assert!(resolution.warnings.is_empty());
        }
    }

    #[test]
    fn unknown_name_falls_back_to_gray_with_warning() {
        let resolution = resolve("TURQUOISE");
        assert_eq!(hexes(&resolution), [FALLBACK_GRAY]);
        assert_eq!(
            resolution.warnings,
            vec![ColorWarning {
                token: "TURQUOISE".to_string()
            }]
        );
    }

    #[test]
    fn hex_tokens_pass_through() {
        assert_eq!(hexes(&resolve("#12ab34")), ["#12ab34"]);
        assert_eq!(hexes(&resolve("#12AB34")), ["#12ab34"]);
        assert!(resolve("#12ab34").warnings.is_empty());
    }

    #[test]
    fn marbled_route_keeps_colour_order() {
        let resolution = resolve("MARBREE (JAUNE / NOIRE)");
        assert_eq!(hexes(&resolution), ["#ffff00", "#000000"]);
        assert!(resolution.fill().is_gradient());

        let english = resolve("marbles (black/yellow)");
        assert_eq!(hexes(&english), ["#000000", "#ffff00"]);

        let accented = resolve("Marbrée (verte/ blanche)");
        assert_eq!(hexes(&accented), ["#008200", "#ffffff"]);
    }

    #[test]
    fn marbled_sub_tokens_fall_back_independently() {
        let resolution = resolve("MARBREE (JAUNE / CHARTREUSE / NOIRE)");
        assert_eq!(hexes(&resolution), ["#ffff00", FALLBACK_GRAY, "#000000"]);
        assert_eq!(resolution.warnings.len(), 1);
        assert_eq!(resolution.warnings[0].token, "CHARTREUSE");
    }

    #[test]
    fn marbled_without_parentheses_splits_remaining_text() {
        assert_eq!(
            hexes(&resolve("MARBREE ROUGE/BLANCHE")),
            ["#ff0000", "#ffffff"]
        );
    }

    #[test]
    fn marbled_with_single_colour_is_solid() {
        let fill = resolve("MARBREE (ROSE)").fill();
        assert_eq!(fill, Fill::Solid(FillColor::from_rgb(0xff, 0xc0, 0xcb)));
    }

    #[test]
    fn label_colour_follows_luminance() {
        assert_eq!(label_color_for_hex("#000000"), Ok(LabelColor::White));
        assert_eq!(label_color_for_hex("#FFFFFF"), Ok(LabelColor::Black));
        assert_eq!(label_color_for_hex("#0000ff"), Ok(LabelColor::White));
        assert_eq!(label_color_for_hex("#ffff00"), Ok(LabelColor::Black));
    }

    #[test]
    fn gradients_always_take_white_labels() {
        let fill = Fill::Gradient(vec![
            FillColor::from_rgb(0xff, 0xff, 0xff),
            FillColor::from_rgb(0xff, 0xff, 0x00),
        ]);
        assert_eq!(fill.label_color(), LabelColor::White);
    }

    #[test]
    fn malformed_hex_is_rejected() {
        for bad in ["#12345", "#1234567", "123456", "#12345g", "#+f0000", ""] {
            assert_eq!(
                luminance(bad),
                Err(ColorError::InvalidColorFormat(bad.to_string())),
                "input {bad:?}"
            );
        }
    }

    #[test]
    fn from_colors_rejects_empty_list() {
        assert_eq!(Fill::from_colors(Vec::new()), None);
    }

    proptest! {
        #[test]
        fn canonical_hex_is_idempotent(r in any::<u8>(), g in any::<u8>(), b in any::<u8>()) {
            let hex = FillColor::from_rgb(r, g, b).to_string();
            let once = resolve(&hex);
            prop_assert_eq!(hexes(&once), vec![hex.clone()]);
            let twice = resolve(&hexes(&once)[0]);
            prop_assert_eq!(once, twice);
        }

        #[test]
        fn luminance_stays_in_unit_range(r in any::<u8>(), g in any::<u8>(), b in any::<u8>()) {
            let value = FillColor::from_rgb(r, g, b).luminance();
            prop_assert!((0.0..=1.0 + 1e-12).contains(&value));
        }
    }
}
