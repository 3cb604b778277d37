//! Provider resolution: map foundation-model identifiers to the provider
//! family the generated model declarations need.

pub mod apply;
pub mod default;
pub mod load;
pub mod types;

pub use apply::*;
pub use load::*;
pub use types::*;
