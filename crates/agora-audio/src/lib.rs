pub mod audio;
pub mod capture;
pub mod device;
mod error;

pub use capture::{CaptureBackend, CaptureState, CpalBackend, Recorder};
pub use error::CaptureError;
