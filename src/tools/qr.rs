//! QR payload formatting and image URL construction.
//!
//! Rendering is left to the configured QR image service; this module only
//! formats the payload for the chosen kind and builds the request URL.

use super::ToolError;
use serde::{Deserialize, Serialize};

pub const MIN_SIZE: u32 = 50;
pub const MAX_SIZE: u32 = 1000;
pub const DEFAULT_SIZE: u32 = 256;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QrKind {
    #[default]
    Text,
    Url,
    Email,
    Phone,
    Sms,
    Wifi,
    Location,
    Vcard,
    Event,
}

/// Error-correction level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Ecc {
    L,
    #[default]
    M,
    Q,
    H,
}

impl Ecc {
    fn as_str(self) -> &'static str {
        match self {
            Ecc::L => "L",
            Ecc::M => "M",
            Ecc::Q => "Q",
            Ecc::H => "H",
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QrRequest {
    pub data: String,
    #[serde(default)]
    pub kind: QrKind,
    #[serde(default = "default_size")]
    pub size: u32,
    #[serde(default)]
    pub ecc: Ecc,
    #[serde(default = "default_fg")]
    pub fg: String,
    #[serde(default = "default_bg")]
    pub bg: String,
    /// Network key for [`QrKind::Wifi`].
    #[serde(default)]
    pub wifi_password: Option<String>,
}

fn default_size() -> u32 {
    DEFAULT_SIZE
}

fn default_fg() -> String {
    "#000000".into()
}

fn default_bg() -> String {
    "#ffffff".into()
}

impl QrRequest {
    pub fn new(data: impl Into<String>, kind: QrKind) -> Self {
        Self {
            data: data.into(),
            kind,
            size: DEFAULT_SIZE,
            ecc: Ecc::default(),
            fg: default_fg(),
            bg: default_bg(),
            wifi_password: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct QrCode {
    pub url: String,
    pub payload: String,
}

/// Backslash-escape the characters the WIFI: scheme treats as delimiters.
fn escape_wifi(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for c in value.chars() {
        if matches!(c, '\\' | ';' | ',' | ':' | '"') {
            out.push('\\');
        }
        out.push(c);
    }
    out
}

fn parse_location(data: &str) -> Result<(f64, f64), ToolError> {
    let invalid = || ToolError::invalid("Location must be 'latitude,longitude'");
    let (lat, lng) = data.split_once(',').ok_or_else(invalid)?;
    let lat: f64 = lat.trim().parse().map_err(|_| invalid())?;
    let lng: f64 = lng.trim().parse().map_err(|_| invalid())?;
    if !(-90.0..=90.0).contains(&lat) || !(-180.0..=180.0).contains(&lng) {
        return Err(ToolError::invalid("Location is out of range"));
    }
    Ok((lat, lng))
}

/// The string encoded into the QR symbol for `kind`.
pub fn format_payload(
    kind: QrKind,
    data: &str,
    wifi_password: Option<&str>,
) -> Result<String, ToolError> {
    let data = data.trim();
    if data.is_empty() {
        return Err(ToolError::invalid("QR content must not be empty"));
    }
    let payload = match kind {
        QrKind::Text | QrKind::Url => data.to_string(),
        QrKind::Email => format!("mailto:{data}"),
        QrKind::Phone => format!("tel:{data}"),
        QrKind::Sms => format!("sms:{data}"),
        QrKind::Wifi => format!(
            "WIFI:T:WPA;S:{};P:{};;",
            escape_wifi(data),
            escape_wifi(wifi_password.unwrap_or_default())
        ),
        QrKind::Location => {
            let (lat, lng) = parse_location(data)?;
            format!("geo:{lat},{lng}")
        }
        QrKind::Vcard => format!("BEGIN:VCARD\nVERSION:3.0\nFN:{data}\nEND:VCARD"),
        QrKind::Event => format!("BEGIN:VEVENT\nSUMMARY:{data}\nEND:VEVENT"),
    };
    Ok(payload)
}

/// Six hex digits without the leading `#`, lowercased.
fn color_param(color: &str) -> Result<String, ToolError> {
    let digits = color.trim().trim_start_matches('#');
    if digits.len() != 6 || !digits.chars().all(|c| c.is_ascii_hexdigit()) {
        return Err(ToolError::invalid(format!(
            "Invalid color '{color}', expected #rrggbb"
        )));
    }
    Ok(digits.to_ascii_lowercase())
}

pub fn build(request: &QrRequest, api_url: &str) -> Result<QrCode, ToolError> {
    let payload = format_payload(request.kind, &request.data, request.wifi_password.as_deref())?;
    let size = request.size.clamp(MIN_SIZE, MAX_SIZE);
    let separator = if api_url.contains('?') { '&' } else { '?' };
    let url = format!(
        "{api_url}{separator}size={size}x{size}&data={}&ecc={}&bgcolor={}&color={}",
        urlencoding::encode(&payload),
        request.ecc.as_str(),
        color_param(&request.bg)?,
        color_param(&request.fg)?,
    );
    Ok(QrCode { url, payload })
}

#[cfg(test)]
mod tests {
    use super::*;

    const API: &str = "https://api.qrserver.com/v1/create-qr-code/";

    #[test]
    fn payload_prefixes_per_kind() {
        let cases = [
            (QrKind::Text, "hello", "hello"),
            (QrKind::Url, "https://x.io", "https://x.io"),
            (QrKind::Email, "a@b.c", "mailto:a@b.c"),
            (QrKind::Phone, "+15550100", "tel:+15550100"),
            (QrKind::Sms, "+15550100", "sms:+15550100"),
            (QrKind::Location, "52.52, 13.405", "geo:52.52,13.405"),
            (
                QrKind::Vcard,
                "Ada Lovelace",
                "BEGIN:VCARD\nVERSION:3.0\nFN:Ada Lovelace\nEND:VCARD",
            ),
            (
                QrKind::Event,
                "Launch",
                "BEGIN:VEVENT\nSUMMARY:Launch\nEND:VEVENT",
            ),
        ];
        for (kind, data, expected) in cases {
            assert_eq!(format_payload(kind, data, None).unwrap(), expected, "{kind:?}");
        }
    }

    #[test]
    fn wifi_payload_escapes_delimiters() {
        let payload = format_payload(QrKind::Wifi, "Cafe;Net", Some("p:ss")).unwrap();
        assert_eq!(payload, r"WIFI:T:WPA;S:Cafe\;Net;P:p\:ss;;");
    }

    #[test]
    fn location_must_be_numeric_and_in_range() {
        assert!(format_payload(QrKind::Location, "north,south", None).is_err());
        assert!(format_payload(QrKind::Location, "91,0", None).is_err());
        assert!(format_payload(QrKind::Location, "45", None).is_err());
    }

    #[test]
    fn url_is_built_with_clamped_size_and_encoded_data() {
        let mut request = QrRequest::new("a b&c", QrKind::Text);
        request.size = 5_000;
        request.ecc = Ecc::H;
        request.fg = "#FF0000".into();

        let code = build(&request, API).unwrap();
        assert_eq!(
            code.url,
            "https://api.qrserver.com/v1/create-qr-code/?size=1000x1000&data=a%20b%26c&ecc=H&bgcolor=ffffff&color=ff0000"
        );
        assert_eq!(code.payload, "a b&c");

        request.size = 1;
        assert!(build(&request, API).unwrap().url.contains("size=50x50"));
    }

    #[test]
    fn existing_query_string_is_extended() {
        let code = build(&QrRequest::new("x", QrKind::Text), "http://qr.local/render?v=1").unwrap();
        assert!(code.url.starts_with("http://qr.local/render?v=1&size=256x256"));
    }

    #[test]
    fn empty_data_and_bad_colors_are_rejected() {
        assert!(build(&QrRequest::new("   ", QrKind::Text), API).is_err());
        let mut request = QrRequest::new("x", QrKind::Text);
        request.bg = "white".into();
        assert!(build(&request, API).is_err());
    }

    #[test]
    fn request_deserializes_with_defaults() {
        let request: QrRequest =
            serde_json::from_str(r#"{"data":"hi","kind":"email","ecc":"Q"}"#).unwrap();
        assert_eq!(request.kind, QrKind::Email);
        assert_eq!(request.ecc, Ecc::Q);
        assert_eq!(request.size, DEFAULT_SIZE);
    }
}
