pub mod correlation;
pub mod returns;
