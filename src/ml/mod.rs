pub mod classifier;
pub mod likelihood;
pub mod vision;
