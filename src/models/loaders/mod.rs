pub mod toml_loader;

pub use toml_loader::{load_toml_to_exam, ExamSource, TomlExamSource};
