// libs/scheduling-cell/src/services/mod.rs
pub mod lifecycle;
pub mod slots;
pub mod validation;
