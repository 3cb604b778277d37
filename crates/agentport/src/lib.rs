//! Translate declarative agent definitions into runnable agent modules.
//!
//! The pipeline runs per agent: schema mapping and tool synthesis for each
//! action group, optional gateway proxy compilation, recursive collaborator
//! compilation, prompt and memory compilation, and finally emission of one
//! Python module per agent plus the manifests needed to run them.

pub mod collab;
pub mod config;
pub mod emit;
pub mod error;
pub mod gateway;
pub mod memory;
pub mod model;
pub mod modelmap;
pub mod parser;
pub mod profile;
pub mod prompts;
pub mod provision;
pub mod schema;
pub mod tools;
pub mod translator;

pub use error::{Result, TranslateError};
pub use translator::{TranslateOptions, TranslationOutput, Translator};
