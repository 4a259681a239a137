pub mod convert;
pub mod estimate;
pub mod input;
