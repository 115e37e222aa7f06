pub mod angle_window;
pub mod answer_state;
pub mod escalation_policy;
pub mod head_pose;
pub mod integrity_monitor;
pub mod landmark_detector;
pub mod navigation;
pub mod restricted_keys;
pub mod session_clock;
pub mod submission;
pub mod violation_log;

pub use angle_window::{AngleWindow, AngleWindows, Interval, Limit};
pub use answer_state::{AnswerState, PaletteSummary, QuestionStatus};
pub use escalation_policy::{EscalationPolicy, PolicyTable};
pub use head_pose::{HeadPoseEstimator, PoseCalibration};
pub use integrity_monitor::{EscalationEffect, IntegrityMonitor, MonitorState, SignalOutcome};
pub use landmark_detector::LandmarkDetector;
pub use navigation::NavigationController;
pub use restricted_keys::RestrictedKeys;
pub use session_clock::{format_hms, ClockTick, SessionClock};
pub use submission::{FinalizeContext, SubmissionController, SubmissionOutbox};
pub use violation_log::ViolationLog;
