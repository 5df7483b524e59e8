use serde::{Deserialize, Serialize};

/// 题型别名表（小写）
static QUESTION_TYPE_ALIASES: phf::Map<&'static str, QuestionType> = phf::phf_map! {
    "descriptive" => QuestionType::Descriptive,
    "essay" => QuestionType::Descriptive,
    "short" => QuestionType::Descriptive,
    "numerical" => QuestionType::Numerical,
    "numeric" => QuestionType::Numerical,
    "number" => QuestionType::Numerical,
    "mcq" => QuestionType::Mcq,
    "choice" => QuestionType::Mcq,
    "multiple_choice" => QuestionType::Mcq,
};

/// 题型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QuestionType {
    /// 主观题（默认）
    #[default]
    Descriptive,
    /// 数值计算题
    Numerical,
    /// 选择题
    Mcq,
}

impl QuestionType {
    /// 获取标准名称
    pub fn name(self) -> &'static str {
        match self {
            QuestionType::Descriptive => "descriptive",
            QuestionType::Numerical => "numerical",
            QuestionType::Mcq => "mcq",
        }
    }

    /// 从名称或别名解析题型（忽略大小写、空格和连字符）
    pub fn from_str(s: &str) -> Option<Self> {
        let key = s.trim().to_lowercase().replace(['-', ' '], "_");
        QUESTION_TYPE_ALIASES.get(key.as_str()).copied()
    }
}

impl std::fmt::Display for QuestionType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

fn deserialize_question_type<'de, D>(deserializer: D) -> Result<Option<QuestionType>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let raw: Option<String> = Option::deserialize(deserializer)?;
    match raw {
        None => Ok(None),
        Some(s) => QuestionType::from_str(&s)
            .map(Some)
            .ok_or_else(|| serde::de::Error::custom(format!("未知题型: {}", s))),
    }
}

/// 题目定义
///
/// 试卷发布后不可变，评分过程只读
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuestionSpec {
    /// 题号（试卷内唯一，正整数）
    pub id: u32,
    /// 题干
    #[serde(default)]
    pub text: String,
    /// 满分
    pub max_marks: f64,
    /// 参考答案
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model_answer: Option<String>,
    #[serde(
        default,
        rename = "type",
        deserialize_with = "deserialize_question_type",
        skip_serializing_if = "Option::is_none"
    )]
    pub question_type: Option<QuestionType>,
    /// 关键词
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub keywords: Vec<String>,
}

impl QuestionSpec {
    pub fn new(id: u32, max_marks: f64) -> Self {
        Self {
            id,
            text: String::new(),
            max_marks,
            model_answer: None,
            question_type: None,
            keywords: Vec::new(),
        }
    }

    pub fn with_model_answer(mut self, answer: impl Into<String>) -> Self {
        self.model_answer = Some(answer.into());
        self
    }

    pub fn with_type(mut self, question_type: QuestionType) -> Self {
        self.question_type = Some(question_type);
        self
    }

    pub fn with_keywords<I, S>(mut self, keywords: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.keywords = keywords.into_iter().map(Into::into).collect();
        self
    }

    /// 实际生效的题型，未设置时按主观题处理
    pub fn effective_type(&self) -> QuestionType {
        self.question_type.unwrap_or_default()
    }
}

/// 试卷
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Exam {
    pub id: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub subject: String,
    /// 题目列表（按展示顺序）
    #[serde(rename = "question")]
    pub questions: Vec<QuestionSpec>,
    #[serde(skip_serializing, skip_deserializing)]
    pub file_path: Option<String>,
}

impl Exam {
    /// 试卷总分
    pub fn max_marks(&self) -> f64 {
        self.questions.iter().map(|q| q.max_marks).sum()
    }

    /// 按展示顺序返回题号
    pub fn question_ids(&self) -> Vec<u32> {
        self.questions.iter().map(|q| q.id).collect()
    }

    pub fn question(&self, id: u32) -> Option<&QuestionSpec> {
        self.questions.iter().find(|q| q.id == id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_question_type_aliases() {
        assert_eq!(QuestionType::from_str("MCQ"), Some(QuestionType::Mcq));
        assert_eq!(
            QuestionType::from_str("multiple-choice"),
            Some(QuestionType::Mcq)
        );
        assert_eq!(
            QuestionType::from_str(" Numeric "),
            Some(QuestionType::Numerical)
        );
        assert_eq!(QuestionType::from_str("essay"), Some(QuestionType::Descriptive));
        assert_eq!(QuestionType::from_str("matching"), None);
    }

    #[test]
    fn test_effective_type_defaults_to_descriptive() {
        let q = QuestionSpec::new(1, 5.0);
        assert_eq!(q.effective_type(), QuestionType::Descriptive);
        let q = q.with_type(QuestionType::Numerical);
        assert_eq!(q.effective_type(), QuestionType::Numerical);
    }

    #[test]
    fn test_exam_max_marks_and_ids() {
        let exam = Exam {
            id: "phy-101".to_string(),
            title: String::new(),
            subject: String::new(),
            questions: vec![QuestionSpec::new(2, 4.0), QuestionSpec::new(1, 6.5)],
            file_path: None,
        };
        assert_eq!(exam.max_marks(), 10.5);
        assert_eq!(exam.question_ids(), vec![2, 1]);
        assert!(exam.question(1).is_some());
        assert!(exam.question(3).is_none());
    }
}
