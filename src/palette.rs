/// Scatter colours, cycled by column index
pub const SCATTER_COLORS: [&str; 8] = [
    "#FF5722", "#2196F3", "#4CAF50", "#FF9800",
    "#9C27B0", "#F44336", "#00BCD4", "#795548",
];

pub fn color_for(index: usize) -> &'static str {
    SCATTER_COLORS[index % SCATTER_COLORS.len()]
}

/// Parse a `#RRGGBB` colour into its components
pub fn parse_hex(color: &str) -> Option<(u8, u8, u8)> {
    let hex = color.strip_prefix('#')?;
    if hex.len() != 6 || !hex.is_ascii() {
        return None;
    }
    let r = u8::from_str_radix(&hex[0..2], 16).ok()?;
    let g = u8::from_str_radix(&hex[2..4], 16).ok()?;
    let b = u8::from_str_radix(&hex[4..6], 16).ok()?;
    Some((r, g, b))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cycle() {
        assert_eq!(color_for(0), "#FF5722");
        assert_eq!(color_for(8), "#FF5722");
        assert_eq!(color_for(9), "#2196F3");
    }

    #[test]
    fn test_parse_hex() {
        assert_eq!(parse_hex("#FF5722"), Some((255, 87, 34)));
        assert_eq!(parse_hex("FF5722"), None);
        assert_eq!(parse_hex("#FFF"), None);
    }
}
