pub mod clean;
pub mod master;

pub use clean::FrameCleaner;
pub use master::{MasterCalibrationBuilder, MasterCalibrations};
