pub mod monthly;
pub mod record;
