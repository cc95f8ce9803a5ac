pub mod size;

pub use size::to_human_size;
