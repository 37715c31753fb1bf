pub mod biquad;
pub mod echo;
pub mod meter;
pub mod pitch;
pub mod reverb;
