pub mod exam;
pub mod grading;
pub mod loaders;
pub mod submission;

pub use exam::{Exam, QuestionSpec, QuestionType};
pub use grading::{
    ClassSummary, ExamReport, Grade, ManualOverride, QuestionResult, StudentRecord, StudentTotal,
};
pub use loaders::{load_all_answer_files, load_exam};
pub use submission::{ExtractedAnswer, Submission, SubmissionStatus};
