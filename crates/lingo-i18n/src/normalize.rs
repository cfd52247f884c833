//! Load-time text normalization

/// Legacy escape character used in catalog files
pub const LEGACY_MARKER: char = '&';

/// Formatting marker understood by the rendering layer
pub const FORMAT_MARKER: char = '§';

const FORMAT_MARKER_STR: &str = "§";

/// Replace every legacy `&` escape with the `§` formatting marker.
///
/// Applied once per value while a snapshot is built; lookups return the
/// stored text untouched. Every `&` is replaced, including a free-standing
/// one, so `"Hallo & Welt"` becomes `"Hallo § Welt"`.
pub fn normalize_text(raw: &str) -> String {
    raw.replace(LEGACY_MARKER, FORMAT_MARKER_STR)
}
