//! Five-swatch color palettes with readable text colors.

use super::ToolError;
use serde::{Deserialize, Serialize};

pub const SWATCHES: usize = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PaletteMode {
    #[default]
    Random,
    Complementary,
    Analogous,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct PaletteRequest {
    pub mode: PaletteMode,
    /// Base color for the harmony modes; random when absent.
    pub base: Option<String>,
    /// Per-slot colors to keep. In random mode locked slots are left as-is;
    /// in harmony modes the first locked color is the base when `base` is absent.
    pub locked: Vec<Option<String>>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Palette {
    pub mode: PaletteMode,
    pub colors: Vec<String>,
    pub text_colors: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Rgb(u8, u8, u8);

impl Rgb {
    fn parse(hex: &str) -> Result<Self, ToolError> {
        let digits = hex.trim().trim_start_matches('#');
        if digits.len() != 6 || !digits.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(ToolError::invalid(format!(
                "Invalid color '{hex}', expected #rrggbb"
            )));
        }
        let channel = |i: usize| u8::from_str_radix(&digits[i..i + 2], 16).unwrap_or(0);
        Ok(Rgb(channel(0), channel(2), channel(4)))
    }

    fn hex(self) -> String {
        format!("#{:02x}{:02x}{:02x}", self.0, self.1, self.2)
    }

    fn inverse(self) -> Self {
        Rgb(255 - self.0, 255 - self.1, 255 - self.2)
    }

    /// Hue in degrees, saturation and lightness in percent.
    fn to_hsl(self) -> (f64, f64, f64) {
        let Rgb(r8, g8, b8) = self;
        let max8 = r8.max(g8).max(b8);
        let min8 = r8.min(g8).min(b8);
        let (r, g, b) = (
            f64::from(r8) / 255.0,
            f64::from(g8) / 255.0,
            f64::from(b8) / 255.0,
        );
        let (max, min) = (f64::from(max8) / 255.0, f64::from(min8) / 255.0);
        let l = (max + min) / 2.0;

        if max8 == min8 {
            return (0.0, 0.0, l * 100.0);
        }
        let d = max - min;
        let s = if l > 0.5 {
            d / (2.0 - max - min)
        } else {
            d / (max + min)
        };
        let h = if max8 == r8 {
            (g - b) / d + if g8 < b8 { 6.0 } else { 0.0 }
        } else if max8 == g8 {
            (b - r) / d + 2.0
        } else {
            (r - g) / d + 4.0
        };
        (h / 6.0 * 360.0, s * 100.0, l * 100.0)
    }

    fn from_hsl(h: f64, s: f64, l: f64) -> Self {
        let (h, s, l) = (h / 360.0, s / 100.0, l / 100.0);
        let a = s * l.min(1.0 - l);
        let f = |n: f64| {
            let k = (n + h * 12.0) % 12.0;
            let color = l - a * (k - 3.0).min(9.0 - k).min(1.0).max(-1.0);
            (255.0 * color).round().clamp(0.0, 255.0) as u8
        };
        Rgb(f(0.0), f(8.0), f(4.0))
    }

    /// YIQ perceived brightness, 0..=255.
    fn brightness(self) -> f64 {
        (f64::from(self.0) * 299.0 + f64::from(self.1) * 587.0 + f64::from(self.2) * 114.0)
            / 1000.0
    }
}

fn random_rgb() -> Rgb {
    let v: u32 = rand::random();
    Rgb((v >> 16) as u8, (v >> 8) as u8, v as u8)
}

pub fn random_color() -> String {
    random_rgb().hex()
}

/// `#000000` on light backgrounds, `#ffffff` on dark ones.
pub fn text_color(background: &str) -> Result<String, ToolError> {
    let rgb = Rgb::parse(background)?;
    Ok(if rgb.brightness() > 128.0 {
        "#000000".into()
    } else {
        "#ffffff".into()
    })
}

/// Base, its RGB inverse, two triadic hues and a dark shade of the base hue.
pub fn complementary(base: &str) -> Result<Vec<String>, ToolError> {
    let rgb = Rgb::parse(base)?;
    let (h, _, _) = rgb.to_hsl();
    Ok(vec![
        rgb.hex(),
        rgb.inverse().hex(),
        Rgb::from_hsl((h + 120.0) % 360.0, 70.0, 50.0).hex(),
        Rgb::from_hsl((h + 240.0) % 360.0, 70.0, 50.0).hex(),
        Rgb::from_hsl(h, 70.0, 30.0).hex(),
    ])
}

/// Hues at -30, -15, 0, +15 and +30 degrees around the base.
pub fn analogous(base: &str) -> Result<Vec<String>, ToolError> {
    let rgb = Rgb::parse(base)?;
    let (h, s, l) = rgb.to_hsl();
    let shifted = |delta: f64| Rgb::from_hsl((h + delta + 360.0) % 360.0, s, l).hex();
    Ok(vec![
        shifted(-30.0),
        shifted(-15.0),
        rgb.hex(),
        shifted(15.0),
        shifted(30.0),
    ])
}

pub fn generate(request: &PaletteRequest) -> Result<Palette, ToolError> {
    let locked: Vec<Option<String>> = request
        .locked
        .iter()
        .take(SWATCHES)
        .map(|slot| {
            slot.as_deref()
                .map(|c| Rgb::parse(c).map(Rgb::hex))
                .transpose()
        })
        .collect::<Result<_, _>>()?;

    let colors = match request.mode {
        PaletteMode::Random => (0..SWATCHES)
            .map(|i| {
                locked
                    .get(i)
                    .cloned()
                    .flatten()
                    .unwrap_or_else(random_color)
            })
            .collect(),
        PaletteMode::Complementary | PaletteMode::Analogous => {
            let base = match &request.base {
                Some(base) => base.clone(),
                None => locked
                    .iter()
                    .flatten()
                    .next()
                    .cloned()
                    .unwrap_or_else(random_color),
            };
            if request.mode == PaletteMode::Complementary {
                complementary(&base)?
            } else {
                analogous(&base)?
            }
        }
    };

    let text_colors = colors
        .iter()
        .map(String::as_str)
        .map(text_color)
        .collect::<Result<_, _>>()?;
    Ok(Palette {
        mode: request.mode,
        colors,
        text_colors,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn complementary_of_pure_red() {
        assert_eq!(
            complementary("#FF0000").unwrap(),
            vec!["#ff0000", "#00ffff", "#26d926", "#2626d9", "#821717"]
        );
    }

    #[test]
    fn analogous_keeps_base_in_the_middle() {
        let colors = analogous("#ff0000").unwrap();
        assert_eq!(colors.len(), SWATCHES);
        assert_eq!(colors[2], "#ff0000");
        let (h, s, _) = Rgb::parse(&colors[0]).unwrap().to_hsl();
        assert!((h - 330.0).abs() < 1.0, "hue {h}");
        assert!(s > 99.0);
    }

    #[test]
    fn grey_has_no_hue_or_saturation() {
        let (h, s, l) = Rgb::parse("#808080").unwrap().to_hsl();
        assert!(h.abs() < f64::EPSILON);
        assert!(s.abs() < f64::EPSILON);
        assert!((l - 50.2).abs() < 0.1);
    }

    #[test]
    fn hsl_roundtrip_is_close() {
        for hex in ["#3a7bd5", "#00d2ff", "#f7971e", "#123456"] {
            let rgb = Rgb::parse(hex).unwrap();
            let (h, s, l) = rgb.to_hsl();
            let back = Rgb::from_hsl(h, s, l);
            assert!(rgb.0.abs_diff(back.0) <= 1, "{hex}");
            assert!(rgb.1.abs_diff(back.1) <= 1, "{hex}");
            assert!(rgb.2.abs_diff(back.2) <= 1, "{hex}");
        }
    }

    #[test]
    fn text_color_follows_yiq_brightness() {
        assert_eq!(text_color("#ffff00").unwrap(), "#000000");
        assert_eq!(text_color("#0000ff").unwrap(), "#ffffff");
        // 128 exactly is not bright enough.
        assert_eq!(text_color("#808080").unwrap(), "#ffffff");
        assert_eq!(text_color("#818181").unwrap(), "#000000");
    }

    #[test]
    fn invalid_colors_are_rejected() {
        for bad in ["", "#fff", "#gggggg", "12345"] {
            assert!(Rgb::parse(bad).is_err(), "{bad}");
        }
    }

    #[test]
    fn random_mode_respects_locked_slots() {
        let palette = generate(&PaletteRequest {
            mode: PaletteMode::Random,
            base: None,
            locked: vec![None, Some("#ABCDEF".into())],
        })
        .unwrap();
        assert_eq!(palette.colors.len(), SWATCHES);
        assert_eq!(palette.colors[1], "#abcdef");
        assert_eq!(palette.text_colors.len(), SWATCHES);
        assert!(palette
            .colors
            .iter()
            .all(|c| c.len() == 7 && c.starts_with('#')));
    }

    #[test]
    fn harmony_mode_uses_first_locked_color_as_base() {
        let palette = generate(&PaletteRequest {
            mode: PaletteMode::Complementary,
            base: None,
            locked: vec![None, None, Some("#ff0000".into())],
        })
        .unwrap();
        assert_eq!(palette.colors[0], "#ff0000");
        assert_eq!(palette.colors[1], "#00ffff");
        assert_eq!(palette.text_colors[1], "#000000");
    }

    #[test]
    fn request_deserializes_with_defaults() {
        let request: PaletteRequest = serde_json::from_str(r#"{"mode":"analogous"}"#).unwrap();
        assert_eq!(request.mode, PaletteMode::Analogous);
        assert!(generate(&request).is_ok());
    }
}
