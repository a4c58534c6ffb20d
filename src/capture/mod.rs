pub mod machine;
pub mod status;

pub use machine::{CaptureMachine, CaptureOp, CapturePolicy};
pub use status::{CapturePhase, CaptureState, CaptureStatusHandle};
