use crate::models::exam::Exam;
use anyhow::{Context, Result};
use std::collections::HashSet;
use std::path::Path;
use tokio::fs;

/// 从 TOML 文件加载试卷定义
pub async fn load_exam(toml_file_path: &Path) -> Result<Exam> {
    let content = fs::read_to_string(toml_file_path)
        .await
        .with_context(|| format!("无法读取TOML文件: {}", toml_file_path.display()))?;

    let mut exam = parse_exam(&content)
        .with_context(|| format!("无法解析TOML文件: {}", toml_file_path.display()))?;

    exam.file_path = Some(toml_file_path.to_string_lossy().to_string());

    tracing::info!(
        "成功加载试卷 {} ({} 道题, 总分 {})",
        exam.id,
        exam.questions.len(),
        exam.max_marks()
    );

    Ok(exam)
}

/// 解析并校验试卷内容
///
/// 题号必须为正且唯一，满分必须为正
pub fn parse_exam(content: &str) -> Result<Exam> {
    let exam: Exam = toml::from_str(content)?;

    if exam.questions.is_empty() {
        anyhow::bail!("试卷 {} 没有任何题目", exam.id);
    }

    let mut seen = HashSet::new();
    for question in &exam.questions {
        if question.id == 0 {
            anyhow::bail!("题号必须为正整数");
        }
        if !seen.insert(question.id) {
            anyhow::bail!("题号重复: {}", question.id);
        }
        if !question.max_marks.is_finite() || question.max_marks <= 0.0 {
            anyhow::bail!("题目 {} 的满分必须为正数: {}", question.id, question.max_marks);
        }
    }

    Ok(exam)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::QuestionType;

    const EXAM_TOML: &str = r#"
id = "bio-mid-2024"
title = "Biology Midterm"
subject = "Biology"

[[question]]
id = 1
text = "What is photosynthesis?"
max_marks = 10
model_answer = "Photosynthesis converts light energy into chemical energy."
keywords = ["light", "chlorophyll"]

[[question]]
id = 2
text = "How many chromosomes do humans have?"
max_marks = 5
model_answer = "46"
type = "numerical"

[[question]]
id = 3
max_marks = 2.5
model_answer = "B"
type = "Multiple Choice"
"#;

    #[test]
    fn test_parse_exam() {
        let exam = parse_exam(EXAM_TOML).unwrap();
        assert_eq!(exam.id, "bio-mid-2024");
        assert_eq!(exam.questions.len(), 3);
        assert_eq!(exam.max_marks(), 17.5);
        assert_eq!(exam.questions[0].keywords, vec!["light", "chlorophyll"]);
        assert_eq!(exam.questions[0].question_type, None);
        assert_eq!(
            exam.questions[1].question_type,
            Some(QuestionType::Numerical)
        );
        assert_eq!(exam.questions[2].question_type, Some(QuestionType::Mcq));
    }

    #[test]
    fn test_parse_exam_rejects_duplicate_ids() {
        let content = r#"
id = "x"
[[question]]
id = 1
max_marks = 1
[[question]]
id = 1
max_marks = 2
"#;
        let err = parse_exam(content).unwrap_err();
        assert!(err.to_string().contains("题号重复"));
    }

    #[test]
    fn test_parse_exam_rejects_non_positive_marks() {
        let content = r#"
id = "x"
[[question]]
id = 1
max_marks = 0
"#;
        assert!(parse_exam(content).is_err());
    }

    #[test]
    fn test_parse_exam_rejects_non_finite_marks() {
        for marks in ["nan", "inf", "-inf"] {
            let content = format!("id = \"x\"\n[[question]]\nid = 1\nmax_marks = {}\n", marks);
            let err = parse_exam(&content).unwrap_err();
            assert!(err.to_string().contains("满分必须为正数"), "{}", marks);
        }
    }

    #[test]
    fn test_parse_exam_rejects_unknown_type() {
        let content = r#"
id = "x"
[[question]]
id = 1
max_marks = 3
type = "matching"
"#;
        assert!(parse_exam(content).is_err());
    }

    #[tokio::test]
    async fn test_load_exam_from_file() {
        let path = std::env::temp_dir().join(format!(
            "answer_grader_exam_{}.toml",
            std::process::id()
        ));
        fs::write(&path, EXAM_TOML).await.unwrap();

        let exam = load_exam(&path).await.unwrap();
        assert_eq!(exam.file_path.as_deref(), Some(path.to_string_lossy().as_ref()));

        fs::remove_file(&path).await.unwrap();
    }
}
