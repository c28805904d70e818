pub mod overlap;
pub mod slots;
