/// JSON value kind a schema field binds to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Kind {
    Null,
    Boolean,
    Number,
    String,
    Array,
    Object,
}

/// Governs how [`Mapper::parse`](crate::jsonmap::Mapper::parse) reacts to a
/// document that does not match the schema.
///
/// Strict mode aborts on a missing named field, leaving fields written by
/// earlier siblings in place; relaxed mode skips it and continues. A type
/// mismatch on a present field is tolerated in both modes: the field is left
/// untouched and its updated flag stays cleared.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ParseMode {
    #[default]
    Relaxed,
    Strict,
}

/// Output layout for [`Mapper::serialize`](crate::jsonmap::Mapper::serialize).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Format {
    /// No whitespace at all.
    #[default]
    Minified,
    /// Two-space indentation; arrays of leaf values stay on one line.
    Pretty,
}

/// Maximum document nesting depth.
///
/// Reserved for a future parser limit; not enforced by the current
/// implementation.
pub const MAX_NESTING_DEPTH: usize = 16;
