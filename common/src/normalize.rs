//! Case- and diacritic-folding shared by `Scorer` and `SuggestionEngine` so
//! brand/name comparisons agree across the whole wizard. Lithuanian flyer
//! text is the only locale observed in practice; the fold table below is
//! deliberately small rather than pulling in a full Unicode normalization
//! dependency for nine letters.

const DIACRITIC_PAIRS: &[(char, char)] = &[
    ('ą', 'a'),
    ('č', 'c'),
    ('ę', 'e'),
    ('ė', 'e'),
    ('į', 'i'),
    ('š', 's'),
    ('ų', 'u'),
    ('ū', 'u'),
    ('ž', 'z'),
];

/// Case-folds and strips Lithuanian diacritics, for case/accent-insensitive
/// comparison of brand and canonical-name strings.
pub fn fold(input: &str) -> String {
    input
        .to_lowercase()
        .chars()
        .map(|c| {
            DIACRITIC_PAIRS
                .iter()
                .find(|(from, _)| *from == c)
                .map(|(_, to)| *to)
                .unwrap_or(c)
        })
        .collect()
}

/// Brand equality per spec §4.2: case-insensitive, diacritics folded.
pub fn brand_eq(a: &str, b: &str) -> bool {
    fold(a) == fold(b)
}

/// Stop words pruned when deriving a canonical name for matching. Kept
/// intentionally short; flyer product names are brief already.
const STOP_WORDS: &[&str] = &["su", "be", "ir", "arba"];

/// Case/diacritic-folded, stop-word-pruned canonical form of a product name,
/// used by the strong/loose search passes.
pub fn canonical_name(input: &str) -> String {
    fold(input)
        .split_whitespace()
        .filter(|w| !STOP_WORDS.contains(w))
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn folds_diacritics_and_case() {
        assert_eq!(fold("Švyturys"), "svyturys");
        assert_eq!(fold("ŽEMAITIJOS"), "zemaitijos");
    }

    #[test]
    fn brand_eq_is_case_and_diacritic_insensitive() {
        assert!(brand_eq("Švyturys", "svyturys"));
        assert!(!brand_eq("Švyturys", "Utenos"));
    }

    #[test]
    fn canonical_name_prunes_stop_words() {
        assert_eq!(canonical_name("Duona su sėlenomis"), "duona selenomis");
    }
}
