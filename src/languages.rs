/// Languages offered by the language pickers. Any other name is still
/// passed through to the provider as typed.
pub const SUPPORTED: [&str; 7] = [
    "Chinese", "English", "Greek", "French", "German", "Japanese", "Korean",
];

/// Canonical spelling of a supported language, matched case-insensitively.
pub fn canonical(name: &str) -> Option<&'static str> {
    let name = name.trim();
    SUPPORTED
        .iter()
        .copied()
        .find(|lang| lang.eq_ignore_ascii_case(name))
}

/// Supported name when recognised, otherwise the trimmed input.
pub fn resolve(name: &str) -> String {
    canonical(name)
        .map(str::to_string)
        .unwrap_or_else(|| name.trim().to_string())
}
