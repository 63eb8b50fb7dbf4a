//! Core A-1: expansion of marginal (age, gender, count) records into an
//! individual-level population table.

pub mod builder;
pub mod person;

pub use person::{EmploymentStatus, Gender, Generation, Person};
