mod client;
mod summary;
mod upload;

pub use client::{ApiClient, RequestError};
pub use summary::{Course, GpaPoint, GradeReport, Semester, SkillScore, SkillSummary};
pub use upload::{GradeFile, UploadError, MAX_UPLOAD_BYTES};
