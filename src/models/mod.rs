pub mod capture;
pub mod exam;
pub mod loaders;
pub mod payload;
pub mod session;
pub mod violation;

pub use capture::{FaceAngle, FaceLandmarks, Frame, ImageArtifact, Point2, PoseSample};
pub use exam::{ExamDefinition, Question, QuestionKey, Subject};
pub use loaders::{load_toml_to_exam, ExamSource, TomlExamSource};
pub use payload::{AnswerRecord, GradingReceipt, SubmissionPayload, VerificationReceipt};
pub use session::{DeviceClass, SessionPhase, SubmitReason};
pub use violation::{EnvironmentSignal, KeyChord, ViolationEvent, ViolationKind};
