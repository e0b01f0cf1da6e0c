//! Character reference classification and lookup helpers.

use strata_ast::options::NamedCharacterReferences;
use strata_kit::String;

/// Find the longest table entry matching a prefix of `after_amp` (the source
/// window immediately following `&`), trying lengths from `max_len` down to 1.
/// Returns the matched name length and the replacement value.
pub(crate) fn match_named_reference(
    table: &NamedCharacterReferences,
    after_amp: &str,
    max_len: usize,
) -> Option<(usize, String)> {
    let mut len = max_len.min(after_amp.len());
    while len > 0 {
        // `get` skips lengths that land inside a multi-byte character
        if let Some(name) = after_amp.get(..len) {
            if let Some(value) = table.get(name) {
                return Some((len, value.clone()));
            }
        }
        len -= 1;
    }
    None
}

/// C0/C1 controls that numeric references must not produce. Tab, line feed,
/// and form feed are whitespace and stay legal.
pub(crate) fn is_control_reference(cp: u32) -> bool {
    matches!(cp, 0x01..=0x08 | 0x0d | 0x0e..=0x1f | 0x7f..=0x9f)
}

/// Noncharacter code points (U+FDD0..=U+FDEF and the U+xxFFFE/U+xxFFFF pairs)
pub(crate) fn is_noncharacter(cp: u32) -> bool {
    (0xfdd0..=0xfdef).contains(&cp) || (cp & 0xfffe) == 0xfffe
}

/// Windows-1252 remappings for numeric references into the C1 range
const CCR_REPLACEMENTS: &[(u32, u32)] = &[
    (0x80, 0x20ac),
    (0x82, 0x201a),
    (0x83, 0x0192),
    (0x84, 0x201e),
    (0x85, 0x2026),
    (0x86, 0x2020),
    (0x87, 0x2021),
    (0x88, 0x02c6),
    (0x89, 0x2030),
    (0x8a, 0x0160),
    (0x8b, 0x2039),
    (0x8c, 0x0152),
    (0x8e, 0x017d),
    (0x91, 0x2018),
    (0x92, 0x2019),
    (0x93, 0x201c),
    (0x94, 0x201d),
    (0x95, 0x2022),
    (0x96, 0x2013),
    (0x97, 0x2014),
    (0x98, 0x02dc),
    (0x99, 0x2122),
    (0x9a, 0x0161),
    (0x9b, 0x203a),
    (0x9c, 0x0153),
    (0x9e, 0x017e),
    (0x9f, 0x0178),
];

/// Replacement for a flagged control reference; unmapped controls keep their
/// value.
pub(crate) fn control_replacement(cp: u32) -> u32 {
    CCR_REPLACEMENTS
        .iter()
        .find(|(from, _)| *from == cp)
        .map_or(cp, |(_, to)| *to)
}

#[cfg(test)]
mod tests {
    use super::*;
    use strata_kit::FxHashMap;

    fn table(entries: &[(&str, &str)]) -> NamedCharacterReferences {
        entries
            .iter()
            .map(|(name, value)| ((*name).into(), (*value).into()))
            .collect::<FxHashMap<_, _>>()
    }

    #[test]
    fn test_longest_match_wins() {
        let table = table(&[("not;", "\u{ac}"), ("notin;", "\u{2209}")]);
        let matched = match_named_reference(&table, "notin; rest", 6);
        assert_eq!(matched, Some((6, "\u{2209}".into())));
        let matched = match_named_reference(&table, "not;x", 6);
        assert_eq!(matched, Some((4, "\u{ac}".into())));
    }

    #[test]
    fn test_no_match() {
        let table = table(&[("amp;", "&")]);
        assert_eq!(match_named_reference(&table, "bogus", 4), None);
        assert_eq!(match_named_reference(&table, "", 4), None);
    }

    #[test]
    fn test_control_classification() {
        assert!(is_control_reference(0x01));
        assert!(is_control_reference(0x0d));
        assert!(is_control_reference(0x9f));
        // whitespace controls are fine
        assert!(!is_control_reference(0x09));
        assert!(!is_control_reference(0x0a));
        assert!(!is_control_reference(0x0c));
        assert!(!is_control_reference(0x20));
    }

    #[test]
    fn test_noncharacters() {
        assert!(is_noncharacter(0xfdd0));
        assert!(is_noncharacter(0xfdef));
        assert!(is_noncharacter(0xfffe));
        assert!(is_noncharacter(0xffff));
        assert!(is_noncharacter(0x1fffe));
        assert!(!is_noncharacter(0xfdcf));
        assert!(!is_noncharacter(0x10000));
    }

    #[test]
    fn test_control_replacements() {
        assert_eq!(control_replacement(0x80), 0x20ac);
        assert_eq!(control_replacement(0x9f), 0x0178);
        // unmapped controls pass through
        assert_eq!(control_replacement(0x81), 0x81);
        assert_eq!(control_replacement(0x01), 0x01);
    }
}
