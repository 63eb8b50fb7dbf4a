//! Core A-2: house-master selection and member lodging.

pub mod builder;
pub mod household;

pub use household::{AgeBucket, FamilyType, GenerationPresence, Household, MasterArchetype};
