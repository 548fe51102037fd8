// Frame-level label pipeline

pub mod inventory;
pub mod labels;
pub mod matrix;
pub mod orchestrator;
pub mod timing;
