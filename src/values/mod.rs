//! Scalar value store: the inputs users typed into each calculator.

mod store;
mod types;

pub use store::{CalculatorStore, DEFAULT_PAGE};
pub use types::{CalculatorValues, FieldValue, FieldValues};
