//! Data model for the sensitivity engine
//!
//! Records flow one way: raw log rows become [`ModificationRecord`]s, output
//! tables become [`OutputDelta`]s, and the two are joined into
//! [`SensitivityResult`]s.

mod delta;
mod ids;
mod modification;
mod results;
mod scope;
mod table;

pub use delta::*;
pub use ids::*;
pub use modification::*;
pub use results::*;
pub use scope::*;
pub use table::*;
