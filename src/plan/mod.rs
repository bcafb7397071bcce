//! Pure planners that derive the parameter envelope of a job from the
//! source metadata and the constraint profile.

pub mod dimensions;
pub mod window;

pub use dimensions::Dimensions;
pub use window::TimeWindow;
