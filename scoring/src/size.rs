//! Parses a free-text flyer size string ("1L", "500g", "0.5 l") into a
//! comparable numeric magnitude. Only the magnitude is compared; unit
//! mismatches (e.g. "500g" vs "1L") are treated as non-comparable rather
//! than guessed at.

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ParsedSize {
    pub magnitude: f64,
    pub unit: Unit,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Unit {
    Gram,
    Liter,
    Piece,
}

pub fn parse_size(input: &str) -> Option<ParsedSize> {
    let trimmed = input.trim().to_lowercase();
    let split_at = trimmed.find(|c: char| c.is_alphabetic())?;
    let (num_part, unit_part) = trimmed.split_at(split_at);
    let num_part = num_part.trim().replace(',', ".");
    let magnitude: f64 = num_part.parse().ok()?;

    let unit = match unit_part.trim() {
        "g" | "gr" | "gram" | "gramai" => Unit::Gram,
        "kg" => return Some(ParsedSize { magnitude: magnitude * 1000.0, unit: Unit::Gram }),
        "ml" => Unit::Liter,
        "l" | "ltr" => return Some(ParsedSize { magnitude, unit: Unit::Liter }),
        "vnt" | "pcs" | "pc" => Unit::Piece,
        _ => return None,
    };

    let magnitude = if unit == Unit::Liter && unit_part.trim() == "ml" { magnitude / 1000.0 } else { magnitude };

    Some(ParsedSize { magnitude, unit })
}

/// True when both sizes parse, share a unit, and are within `tolerance_pct`
/// of each other (spec §4.2: "Size within ±20%").
pub fn within_tolerance(a: &str, b: &str, tolerance_pct: f64) -> bool {
    let (Some(pa), Some(pb)) = (parse_size(a), parse_size(b)) else { return false };
    if pa.unit != pb.unit {
        return false;
    }
    if pa.magnitude == 0.0 {
        return pb.magnitude == 0.0;
    }
    let diff_pct = ((pa.magnitude - pb.magnitude).abs() / pa.magnitude) * 100.0;
    diff_pct <= tolerance_pct
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_liters_and_kilograms() {
        assert_eq!(parse_size("1L"), Some(ParsedSize { magnitude: 1.0, unit: Unit::Liter }));
        assert_eq!(parse_size("500g"), Some(ParsedSize { magnitude: 500.0, unit: Unit::Gram }));
        assert_eq!(parse_size("1kg"), Some(ParsedSize { magnitude: 1000.0, unit: Unit::Gram }));
    }

    #[test]
    fn within_tolerance_accepts_small_drift() {
        assert!(within_tolerance("1L", "1.1L", 20.0));
        assert!(!within_tolerance("1L", "1.3L", 20.0));
    }

    #[test]
    fn within_tolerance_rejects_mismatched_units() {
        assert!(!within_tolerance("1L", "500g", 20.0));
    }

    #[test]
    fn within_tolerance_rejects_unparseable_input() {
        assert!(!within_tolerance("family pack", "1L", 20.0));
    }
}
