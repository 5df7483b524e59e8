//! 答案切分服务 - 业务能力层
//!
//! 把 OCR 得到的整页文本切分为"题号 → 作答文本"
//!
//! 逐行扫描，显式状态机：
//! - `Idle`：尚未遇到任何题号标记
//! - `Open`：正在收集某道题的作答
//!
//! 遇到题号标记时先提交当前收集的内容再打开新题；文本结束时提交最后一题。
//! 同一题号出现多次时以最后一次为准。

use regex::Regex;
use std::collections::{HashMap, HashSet};
use std::sync::LazyLock;
use tracing::debug;

use crate::models::{ExtractedAnswer, QuestionSpec, Submission};

/// 超过该长度（字符数）的带文字标记行视为回显了题干
pub const PROMPT_MARKER_MIN_LEN: usize = 20;

/// 纯标记行：`1.` `1)` `(1)` `Q1` `Q.1` `Question 1` `Ans 1` `Answer 1`，可带冒号
static PURE_MARKER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)^(?:(?:q(?:uestion)?|ans(?:wer)?)\s*\.?\s*(\d+)\s*[.)]?|(\d+)\s*[.)]|\(\s*(\d+)\s*\))\s*:?$",
    )
    .expect("纯标记正则无效")
});

/// 带题干的标记行：`Question 3: Explain the water cycle ...`
static PROMPT_MARKER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^(?:q(?:uestion)?|ans(?:wer)?)\s*\.?\s*(\d+)\s*[.):]?\s+\S")
        .expect("题干标记正则无效")
});

/// PDF 转图片时插入的分页行：`--- Page 2 ---`
static PAGE_SEPARATOR: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^-{2,}\s*page\s+\d+\s*-{2,}$").expect("分页正则无效")
});

/// 标记行类型
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MarkerKind {
    /// 整行只有题号
    Bare,
    /// 题号后面跟着回显的题干
    WithPrompt,
}

/// 识别出的题号标记
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Marker {
    pub question_id: u32,
    pub kind: MarkerKind,
}

/// 判断一行（已 trim）是否为题号标记
pub fn parse_marker(line: &str) -> Option<Marker> {
    if let Some(caps) = PURE_MARKER.captures(line) {
        let id = caps
            .get(1)
            .or_else(|| caps.get(2))
            .or_else(|| caps.get(3))
            .and_then(|m| m.as_str().parse::<u32>().ok())?;
        return Some(Marker {
            question_id: id,
            kind: MarkerKind::Bare,
        });
    }

    if line.chars().count() > PROMPT_MARKER_MIN_LEN {
        if let Some(caps) = PROMPT_MARKER.captures(line) {
            let id = caps.get(1)?.as_str().parse::<u32>().ok()?;
            return Some(Marker {
                question_id: id,
                kind: MarkerKind::WithPrompt,
            });
        }
    }

    None
}

/// 扫描状态
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScanState {
    /// 尚未打开任何题目
    Idle,
    /// 正在收集某道题的作答
    Open { question_id: u32, lines: Vec<String> },
}

/// 逐行扫描器
#[derive(Debug)]
pub struct Scanner {
    state: ScanState,
    captured: HashMap<u32, String>,
}

impl Scanner {
    pub fn new() -> Self {
        Self {
            state: ScanState::Idle,
            captured: HashMap::new(),
        }
    }

    pub fn state(&self) -> &ScanState {
        &self.state
    }

    /// 已提交的作答（不含当前仍在收集的题目）
    pub fn captured(&self) -> &HashMap<u32, String> {
        &self.captured
    }

    /// 处理一行原始文本
    pub fn feed(&mut self, raw_line: &str) {
        let line = raw_line.trim();
        if line.is_empty() || PAGE_SEPARATOR.is_match(line) {
            return;
        }

        if let Some(marker) = parse_marker(line) {
            debug!(
                "识别到题号标记: 题目 {} ({:?})",
                marker.question_id, marker.kind
            );
            self.flush();
            self.state = ScanState::Open {
                question_id: marker.question_id,
                lines: Vec::new(),
            };
            return;
        }

        if let ScanState::Open { lines, .. } = &mut self.state {
            lines.push(line.to_string());
        }
    }

    /// 提交当前收集的作答并回到 `Idle`
    pub fn flush(&mut self) {
        if let ScanState::Open { question_id, lines } =
            std::mem::replace(&mut self.state, ScanState::Idle)
        {
            let text = lines.join(" ").trim().to_string();
            if self.captured.insert(question_id, text).is_some() {
                debug!("题目 {} 出现重复标记，采用最后一次作答", question_id);
            }
        }
    }

    /// 文本结束：提交最后一题并返回全部作答
    pub fn finish(mut self) -> HashMap<u32, String> {
        self.flush();
        self.captured
    }
}

impl Default for Scanner {
    fn default() -> Self {
        Self::new()
    }
}

/// 单题切分结果
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SegmentedAnswer {
    pub question_id: u32,
    pub text: String,
    /// 文本中是否找到了该题的标记
    pub marker_found: bool,
}

/// 切分整页文本
///
/// 输出顺序与 `expected_ids` 一致（重复的题号只保留第一次）；
/// 未找到标记的题目对应空字符串。相同输入总是得到相同输出。
pub fn segment(text: &str, expected_ids: &[u32]) -> Vec<SegmentedAnswer> {
    let mut scanner = Scanner::new();
    for line in text.lines() {
        scanner.feed(line);
    }
    let mut captured = scanner.finish();

    let mut seen = HashSet::new();
    expected_ids
        .iter()
        .filter(|id| seen.insert(**id))
        .map(|&id| match captured.remove(&id) {
            Some(text) => SegmentedAnswer {
                question_id: id,
                text,
                marker_found: true,
            },
            None => SegmentedAnswer {
                question_id: id,
                text: String::new(),
                marker_found: false,
            },
        })
        .collect()
}

/// 把一份答卷切分为 `ExtractedAnswer` 列表
///
/// 找到标记的题目抽取置信度为 1.0，否则为 0.0
pub fn extract_answers(submission: &Submission, questions: &[QuestionSpec]) -> Vec<ExtractedAnswer> {
    let ids: Vec<u32> = questions.iter().map(|q| q.id).collect();
    segment(&submission.recognized_text, &ids)
        .into_iter()
        .map(|answer| ExtractedAnswer {
            question_id: answer.question_id,
            text: answer.text,
            source_document: submission.source_document.clone(),
            extraction_confidence: if answer.marker_found { 1.0 } else { 0.0 },
        })
        .collect()
}
