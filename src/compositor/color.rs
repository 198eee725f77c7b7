use image::Rgba;

pub const DEFAULT_FILL: Rgba<u8> = Rgba([255, 255, 255, 255]);
pub const DEFAULT_STROKE: Rgba<u8> = Rgba([0, 0, 0, 255]);

/// Parses `#rgb`, `#rrggbb`, `#rrggbbaa` or one of a few color names.
pub fn parse_color(raw: &str) -> Option<Rgba<u8>> {
    let value = raw.trim().to_ascii_lowercase();

    let named = match value.as_str() {
        "white" => Some([255, 255, 255]),
        "black" => Some([0, 0, 0]),
        "red" => Some([255, 0, 0]),
        "yellow" => Some([255, 255, 0]),
        "blue" => Some([0, 0, 255]),
        "green" => Some([0, 128, 0]),
        _ => None,
    };
    if let Some([r, g, b]) = named {
        return Some(Rgba([r, g, b, 255]));
    }

    let hex = value.strip_prefix('#')?;
    if !hex.chars().all(|c| c.is_ascii_hexdigit()) {
        return None;
    }

    match hex.len() {
        3 => {
            let mut channels = [0u8; 3];
            for (i, c) in hex.chars().enumerate() {
                let nibble = c.to_digit(16)? as u8;
                channels[i] = nibble * 17;
            }
            Some(Rgba([channels[0], channels[1], channels[2], 255]))
        }
        6 | 8 => {
            let byte = |i: usize| u8::from_str_radix(&hex[i..i + 2], 16).ok();
            let alpha = if hex.len() == 8 { byte(6)? } else { 255 };
            Some(Rgba([byte(0)?, byte(2)?, byte(4)?, alpha]))
        }
        _ => None,
    }
}

/// The parsed color, or `fallback` when absent or unparsable.
pub fn color_or(raw: Option<&str>, fallback: Rgba<u8>) -> Rgba<u8> {
    raw.and_then(parse_color).unwrap_or(fallback)
}
