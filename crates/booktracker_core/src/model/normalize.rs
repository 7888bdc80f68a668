//! Display-consistency rules applied to caller input before persistence.
//!
//! These rules keep the catalog tidy (one "Herbert" instead of "herbert" and
//! "HERBERT"); they are not correctness invariants, so the name rule can be
//! switched off per service instance.

/// Controls how free-text book fields are cleaned up.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NormalizationPolicy {
    /// Capitalize author names, language and genre (`first` upper, rest lower).
    pub capitalize_names: bool,
}

impl Default for NormalizationPolicy {
    fn default() -> Self {
        Self {
            capitalize_names: true,
        }
    }
}

impl NormalizationPolicy {
    /// Policy that only trims surrounding whitespace.
    pub fn trim_only() -> Self {
        Self {
            capitalize_names: false,
        }
    }

    /// Trims a required text field.
    pub fn text(&self, value: &str) -> String {
        value.trim().to_string()
    }

    /// Trims a required name-like field and capitalizes it when enabled.
    pub fn name(&self, value: &str) -> String {
        let trimmed = value.trim();
        if self.capitalize_names {
            capitalize(trimmed)
        } else {
            trimmed.to_string()
        }
    }

    /// Trims an optional text field; blank values collapse to `None`.
    pub fn optional_text(&self, value: Option<&str>) -> Option<String> {
        value
            .map(str::trim)
            .filter(|trimmed| !trimmed.is_empty())
            .map(str::to_string)
    }

    /// Optional counterpart of [`NormalizationPolicy::name`].
    pub fn optional_name(&self, value: Option<&str>) -> Option<String> {
        self.optional_text(value).map(|trimmed| self.name(&trimmed))
    }
}

/// Uppercases the first character and lowercases the rest.
pub fn capitalize(value: &str) -> String {
    let mut chars = value.chars();
    match chars.next() {
        Some(first) => first
            .to_uppercase()
            .chain(chars.flat_map(char::to_lowercase))
            .collect(),
        None => String::new(),
    }
}
