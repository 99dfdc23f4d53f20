//! Rowcast Schema
//!
//! The logical schema layer for Rowcast:
//! - Type resolution between the external type vocabulary and semantic types
//! - Qualifier encoding (text and hex-encoded binary column names)
//! - The byte-level codec between raw cell bytes and typed values
//! - Mapping assembly and validation

#![warn(clippy::all, clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod codec;
pub mod mapping;
pub mod qualifier;
pub mod types;

pub use codec::Value;
pub use mapping::{ColumnDescriptor, Mapping, MappingBuilder};
pub use qualifier::Qualifier;
pub use types::{KeyType, SemanticType, Width};
