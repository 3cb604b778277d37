//! Schema normalization: type declarations for generated models and JSON
//! Schema for advertised tool inputs.

pub mod json_schema;
pub mod mapper;
pub mod registry;
pub mod render;

pub use mapper::SchemaTypeMapper;
pub use registry::TypeRegistry;
