pub mod registry;
pub mod values;
