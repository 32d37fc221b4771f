mod models;
mod raw;

pub use models::*;
pub use raw::{RawRow, RawValue};
