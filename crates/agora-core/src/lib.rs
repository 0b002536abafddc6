mod error;
pub mod reducer;
pub mod session;
pub mod visual;

pub use error::SessionError;
pub use reducer::{Readiness, Reducer, Signal};
pub use session::{OutboundSink, SessionController};
pub use visual::{VisualDispatcher, WhiteboardSurface};
