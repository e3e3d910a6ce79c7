//! Mapping OpenWeather icon codes to something displayable.

const ICON_BASE_URL: &str = "https://openweathermap.org/img/wn";

/// Local asset shown when the code is missing or malformed.
pub const FALLBACK_ICON: &str = "assets/weather-unknown.png";

/// Image URL for an icon code such as `10n`.
pub fn icon_url(code: &str) -> String {
    if is_icon_code(code) {
        format!("{ICON_BASE_URL}/{code}@2x.png")
    } else {
        FALLBACK_ICON.to_string()
    }
}

/// Terminal glyph for the icon family (the numeric part of the code).
pub fn icon_glyph(code: &str) -> &'static str {
    if !is_icon_code(code) {
        return "?";
    }
    let night = code.ends_with('n');
    match &code[..2] {
        "01" if night => "🌙",
        "01" => "☀️",
        "02" => "⛅",
        "03" | "04" => "☁️",
        "09" | "10" => "🌧️",
        "11" => "⛈️",
        "13" => "❄️",
        "50" => "🌫️",
        _ => "?",
    }
}

fn is_icon_code(code: &str) -> bool {
    let bytes = code.as_bytes();
    bytes.len() == 3
        && bytes[0].is_ascii_digit()
        && bytes[1].is_ascii_digit()
        && matches!(bytes[2], b'd' | b'n')
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn url_follows_the_openweather_pattern() {
        assert_eq!(icon_url("01d"), "https://openweathermap.org/img/wn/01d@2x.png");
    }

    #[test]
    fn malformed_codes_fall_back_to_local_asset() {
        assert_eq!(icon_url(""), FALLBACK_ICON);
        assert_eq!(icon_url("01x"), FALLBACK_ICON);
        assert_eq!(icon_url("../etc"), FALLBACK_ICON);
    }

    #[test]
    fn glyphs() {
        assert_eq!(icon_glyph("01d"), "☀️");
        assert_eq!(icon_glyph("01n"), "🌙");
        assert_eq!(icon_glyph("10d"), "🌧️");
        assert_eq!(icon_glyph("99d"), "?");
        assert_eq!(icon_glyph(""), "?");
    }
}
