pub mod error;
pub(crate) mod doc;
pub mod mapper;
pub(crate) mod mem;
pub mod schema;
pub mod types;

pub use error::Error;
pub use mapper::Mapper;
pub use mem::hooks::{AcquireFn, Hooks, ReleaseFn};
pub use schema::{Field, StrSlot};
pub use types::{Format, Kind, ParseMode, MAX_NESTING_DEPTH};

pub mod prelude {
    pub use super::{Error, Field, Format, Hooks, Kind, Mapper, ParseMode, StrSlot};
}
