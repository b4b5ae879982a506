//! A `no_std` schema-driven JSON ↔ struct mapper for embedded systems.
//!
//! This crate converts between native struct fields and JSON text in both
//! directions, driven by a declarative schema the application builds over its
//! own storage. All transient memory (the intermediate document tree and its
//! string copies) comes from a caller-selected strategy: a bounded pool, the
//! platform heap, a bump arena over a static buffer, or user-supplied hooks.
//! That makes the library usable on RTOS tasks and bare-metal loops where a
//! general-purpose allocator is unavailable or unwanted.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────┐      ┌─────────────────────┐
//! │  Application struct │      │     JSON text       │
//! │  (caller storage)   │      │   (caller buffer)   │
//! └─────────┬───────────┘      └──────────▲──────────┘
//!           │ Field<'_> schema            │ print / parse
//! ┌─────────▼───────────┐      ┌──────────┴──────────┐
//! │       Mapper        │─────▶│ Document (ephemeral │
//! │  serialize / parse  │      │ typed tree)         │
//! └─────────┬───────────┘      └──────────┬──────────┘
//!           │        acquire / release    │
//! ┌─────────▼─────────────────────────────▼─────────┐
//! │  Strategy: pool │ heap │ arena │ custom hooks   │
//! └─────────────────────────────────────────────────┘
//! ```
//!
//! The document tree is strictly call-scoped: built, consumed and discarded
//! within one `serialize` or `parse` invocation, never shared across calls.
//!
//! # Example
//!
//! ```rust
//! use embedded_jsonmap::prelude::*;
//!
//! let mut name: heapless::String<32> = heapless::String::new();
//! let _ = name.push_str("Adam");
//! let mut coords = [12.0_f64, 34.0];
//!
//! let mut scratch = [0u8; 1024];
//! let mut mapper = Mapper::arena(&mut scratch).unwrap();
//!
//! let [x, y] = &mut coords;
//! let mut position = [Field::number("", x), Field::number("", y)];
//! let mut fields = [
//!     Field::string("name", &mut name),
//!     Field::array("position", &mut position),
//! ];
//!
//! let mut out = [0u8; 256];
//! let text = mapper.serialize(&fields, &mut out, Format::Minified).unwrap();
//! assert_eq!(text, r#"{"name":"Adam","position":[12,34]}"#);
//!
//! mapper
//!     .parse(r#"{"name":"Eve","position":[56,78]}"#, &mut fields, ParseMode::Strict)
//!     .unwrap();
//! assert!(fields[0].is_updated());
//! drop(fields);
//! assert_eq!(name.as_str(), "Eve");
//! assert_eq!(coords, [56.0, 78.0]);
//! ```

#![deny(unsafe_code)]
#![no_std]

#[cfg(feature = "heap")]
extern crate alloc;

pub mod jsonmap;

pub mod prelude {
    pub use crate::jsonmap::prelude::*;
}
