pub mod camera;
pub mod clock;
pub mod environment;

pub use camera::{CameraDevice, CameraGate, CameraLease, CameraStream};
pub use clock::{Clock, ManualClock, TokioClock};
pub use environment::{EnvironmentControl, EnvironmentSignalSource, HeadlessEnvironment};
