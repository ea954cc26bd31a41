pub mod categories;
pub mod core;
pub mod fields;
