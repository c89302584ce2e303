pub mod history;
pub mod losses;
pub mod trainer;

pub use history::{EpochLosses, TrainingHistory};
pub use trainer::{Trainer, TrainerState, TrainingConfig, TrainingOutcome};
