//! Agent domain types: definitions, synthesized declarations, naming.

pub mod definition;
pub mod naming;
pub mod types;

pub use definition::*;
pub use naming::*;
pub use types::*;
