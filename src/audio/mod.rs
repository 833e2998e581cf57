pub mod device;
pub mod format;
pub mod mapper;
pub mod parameters;
pub mod pipeline;
pub mod processor;
pub mod resampler;
