//! Grade level ("Kelas") extraction from dataset names.

use once_cell::sync::Lazy;
use regex::Regex;

// Longer numerals come first so "VIII" is not read as "V".
static KELAS: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)Kelas\s+(XII|XI|IX|VIII|VII|VI|IV|III|II|X|V|I|\d+)").expect("valid kelas regex")
});
static ROMAN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\b(XII|XI|IX|VIII|VII|VI|IV|III|II|X|V|I)\b").expect("valid roman regex")
});

const ROMAN_ORDER: [&str; 12] = [
    "I", "II", "III", "IV", "V", "VI", "VII", "VIII", "IX", "X", "XI", "XII",
];

pub const UNKNOWN_LEVEL: &str = "Unknown";
pub const ALL_LEVELS: &str = "All";

/// Level token such as `VII` or `10`, if the name carries one
pub fn extract_class_level(name: &str) -> Option<String> {
    KELAS
        .captures(name)
        .or_else(|| ROMAN.captures(name))
        .map(|caps| caps[1].to_string())
}

/// Display label such as `Kelas VII`, or `Unknown Class`
pub fn class_label(name: &str) -> String {
    match extract_class_level(name) {
        Some(level) => format!("Kelas {}", level),
        None => "Unknown Class".to_string(),
    }
}

/// Filter chips for a library: `All` first, roman numerals in order, then the rest.
pub fn unique_class_levels<'a, I>(names: I) -> Vec<String>
where
    I: IntoIterator<Item = &'a str>,
{
    let mut levels: Vec<String> = Vec::new();
    for level in names.into_iter().filter_map(extract_class_level) {
        if !levels.contains(&level) {
            levels.push(level);
        }
    }

    levels.sort_by(|a, b| {
        let ai = ROMAN_ORDER.iter().position(|r| r == a);
        let bi = ROMAN_ORDER.iter().position(|r| r == b);
        match (ai, bi) {
            (Some(ai), Some(bi)) => ai.cmp(&bi),
            _ => a.cmp(b),
        }
    });

    let mut out = Vec::with_capacity(levels.len() + 1);
    out.push(ALL_LEVELS.to_string());
    out.extend(levels);
    out
}
