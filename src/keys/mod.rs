//! Row Identity: pseudo primary keys and comparison key resolution

pub mod extract;
pub mod pseudo;

pub use extract::{KeyExtractor, KeyPolicy};
pub use pseudo::{PseudoKeyValidation, PseudoKeys};
