//! Declarative schema over application-owned storage.
//!
//! A schema is an ordered slice of [`Field`]s, each binding one JSON key (or
//! array position) to a mutable reference into the caller's own struct. The
//! mapper never allocates, copies ownership of, or frees that storage; the
//! references are plain borrows valid for the duration of one serialize or
//! parse call.
//!
//! Containers nest by borrowing a child `Field` slice, so a schema is built
//! bottom-up with ordinary arrays:
//!
//! ```rust
//! use embedded_jsonmap::prelude::*;
//!
//! let mut city: heapless::String<16> = heapless::String::new();
//! let mut zip = 0.0_f64;
//! let mut address = [
//!     Field::string("city", &mut city),
//!     Field::number("zip", &mut zip),
//! ];
//! let fields = [Field::object("address", &mut address)];
//! assert_eq!(fields[0].kind(), Kind::Object);
//! ```

use core::fmt;

use crate::jsonmap::types::Kind;

/// Capacity-erased bounded string storage.
///
/// The seam between the mapper and whatever bounded string type the
/// application uses. Implemented for every `heapless::String<N>`; custom
/// fixed buffers can implement it as well.
pub trait StrSlot {
    /// Maximum number of bytes the storage can hold.
    fn capacity(&self) -> usize;

    /// Current contents.
    fn as_str(&self) -> &str;

    /// Replaces the contents with `s`, truncating at a character boundary
    /// if `s` exceeds the capacity.
    fn set(&mut self, s: &str);
}

impl<const N: usize> StrSlot for heapless::String<N> {
    fn capacity(&self) -> usize {
        N
    }

    fn as_str(&self) -> &str {
        self
    }

    fn set(&mut self, s: &str) {
        self.clear();
        let mut end = s.len().min(N);
        while !s.is_char_boundary(end) {
            end -= 1;
        }
        // Cannot fail: the slice was clipped to the capacity.
        let _ = self.push_str(&s[..end]);
    }
}

/// Typed storage binding of one schema field.
///
/// Replaces the classic untyped pointer-plus-tag binding: an invalid
/// kind/storage pairing is unrepresentable.
pub(crate) enum Slot<'a> {
    /// JSON `null` zeroes the bound word on parse.
    Null(&'a mut u32),
    Bool(&'a mut bool),
    Number(&'a mut f64),
    Str(&'a mut dyn StrSlot),
    Array {
        children: &'a mut [Field<'a>],
        /// Element count: declared capacity until a parse overwrites it with
        /// the count actually written.
        len: usize,
    },
    Object(&'a mut [Field<'a>]),
}

/// One element of a schema: a name, a typed storage binding and an update
/// flag maintained by parse.
pub struct Field<'a> {
    name: &'a str,
    slot: Slot<'a>,
    updated: bool,
}

impl<'a> Field<'a> {
    /// Binds a bounded string. An empty `name` makes the field stand in
    /// place of its container (array element or document root wrapper).
    pub fn string(name: &'a str, storage: &'a mut dyn StrSlot) -> Self {
        Self::new(name, Slot::Str(storage))
    }

    /// Binds a 64-bit floating point number.
    pub fn number(name: &'a str, storage: &'a mut f64) -> Self {
        Self::new(name, Slot::Number(storage))
    }

    /// Binds a boolean.
    pub fn boolean(name: &'a str, storage: &'a mut bool) -> Self {
        Self::new(name, Slot::Bool(storage))
    }

    /// Binds a word that is zeroed when the document holds JSON `null`.
    pub fn null(name: &'a str, storage: &'a mut u32) -> Self {
        Self::new(name, Slot::Null(storage))
    }

    /// Declares an array whose elements follow the child schema, one child
    /// per element. Children of an array normally carry empty names.
    pub fn array(name: &'a str, children: &'a mut [Field<'a>]) -> Self {
        let len = children.len();
        Self::new(name, Slot::Array { children, len })
    }

    /// Declares a nested object described by the child schema. An empty
    /// child slice maps to an empty JSON object.
    pub fn object(name: &'a str, children: &'a mut [Field<'a>]) -> Self {
        Self::new(name, Slot::Object(children))
    }

    fn new(name: &'a str, slot: Slot<'a>) -> Self {
        Self {
            name,
            slot,
            updated: false,
        }
    }

    pub fn name(&self) -> &str {
        self.name
    }

    pub fn kind(&self) -> Kind {
        match self.slot {
            Slot::Null(_) => Kind::Null,
            Slot::Bool(_) => Kind::Boolean,
            Slot::Number(_) => Kind::Number,
            Slot::Str(_) => Kind::String,
            Slot::Array { .. } => Kind::Array,
            Slot::Object(_) => Kind::Object,
        }
    }

    /// True if the most recent parse wrote this field's storage.
    pub fn is_updated(&self) -> bool {
        self.updated
    }

    pub fn clear_updated(&mut self) {
        self.updated = false;
    }

    /// Child fields of an array or object; empty for leaves.
    ///
    /// The children stay mutably borrowed while the parent exists, so this
    /// is the way to read their update state after a parse: walk down from
    /// the root fields and inspect [`Field::is_updated`] on each child.
    pub fn children(&self) -> &[Field<'a>] {
        match &self.slot {
            Slot::Array { children, .. } => children,
            Slot::Object(children) => children,
            _ => &[],
        }
    }

    /// For arrays, the element count seen by the most recent parse (the
    /// declared capacity before any parse). Zero for leaves, the child count
    /// for objects.
    pub fn parsed_len(&self) -> usize {
        match &self.slot {
            Slot::Array { len, .. } => *len,
            Slot::Object(children) => children.len(),
            _ => 0,
        }
    }

    pub(crate) fn slot(&self) -> &Slot<'a> {
        &self.slot
    }

    pub(crate) fn slot_mut(&mut self) -> &mut Slot<'a> {
        &mut self.slot
    }

    pub(crate) fn set_updated(&mut self, updated: bool) {
        self.updated = updated;
    }
}

impl fmt::Debug for Field<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Field")
            .field("name", &self.name)
            .field("kind", &self.kind())
            .field("updated", &self.updated)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn constructors_report_their_kind() {
        let mut b = false;
        let mut n = 0.0;
        let mut s: heapless::String<8> = heapless::String::new();
        let mut z = 0u32;

        assert_eq!(Field::boolean("b", &mut b).kind(), Kind::Boolean);
        assert_eq!(Field::number("n", &mut n).kind(), Kind::Number);
        assert_eq!(Field::string("s", &mut s).kind(), Kind::String);
        assert_eq!(Field::null("z", &mut z).kind(), Kind::Null);
        assert_eq!(Field::array("a", &mut []).kind(), Kind::Array);
        assert_eq!(Field::object("o", &mut []).kind(), Kind::Object);
    }

    #[test]
    fn fields_start_not_updated() {
        let mut n = 0.0;
        let field = Field::number("n", &mut n);
        assert!(!field.is_updated());
        assert_eq!(field.name(), "n");
    }

    #[test]
    fn array_parsed_len_defaults_to_declared_capacity() {
        let mut a = 0.0;
        let mut b = 0.0;
        let mut items = [Field::number("", &mut a), Field::number("", &mut b)];
        let field = Field::array("xs", &mut items);
        assert_eq!(field.parsed_len(), 2);
    }

    #[test]
    fn children_are_visible_through_the_parent() {
        let mut a = 0.0;
        let mut items = [Field::number("", &mut a)];
        let field = Field::array("xs", &mut items);
        assert_eq!(field.children().len(), 1);
        assert!(!field.children()[0].is_updated());

        let mut n = 0.0;
        assert!(Field::number("n", &mut n).children().is_empty());
    }

    #[test]
    fn str_slot_truncates_at_capacity() {
        let mut s: heapless::String<4> = heapless::String::new();
        s.set("Adamson");
        assert_eq!(s.as_str(), "Adam");

        s.set("ok");
        assert_eq!(s.as_str(), "ok");
    }

    #[test]
    fn str_slot_truncates_on_char_boundary() {
        let mut s: heapless::String<5> = heapless::String::new();
        // 'é' is two bytes; a naive byte cut at 5 would split it.
        s.set("abcdé");
        assert_eq!(s.as_str(), "abcd");
    }

    #[test]
    fn debug_shows_name_kind_and_flag() {
        let mut n = 0.0;
        let field = Field::number("speed", &mut n);
        let mut out: heapless::String<64> = heapless::String::new();
        core::fmt::write(&mut out, format_args!("{field:?}")).unwrap();
        assert!(out.as_str().contains("speed"));
        assert!(out.as_str().contains("Number"));
    }
}
