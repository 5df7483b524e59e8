pub mod grading_flow;
pub mod submission_ctx;

pub use grading_flow::{GradedSubmission, GradingFlow};
pub use submission_ctx::SubmissionCtx;
