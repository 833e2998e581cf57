pub mod edge;
pub mod tuner;

pub use edge::EdgeDetector;
pub use tuner::ParameterTuner;
