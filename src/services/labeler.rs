//! 单元标签 - 业务能力层
//!
//! 给每个单元一个简短可读的标签（`Problem 1(a)(ii)` / `Part 3`），
//! 用在提示词里，也用作最终文档的小节标题。纯函数，永不失败。

use regex::Regex;
use std::sync::LazyLock;

use crate::models::unit::{header_line, Unit};

/// Chunker 合成的标签行
static LABEL_LINE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?:Problem \d{1,3}(?:\([a-z]\))?(?:\((?:i{1,3}|iv|vi{0,3}|ix|x)\))?|Part \d+)$")
        .expect("valid label grammar regex")
});

/// 正文中的 "Problem N" / "Question N" 说法
static PROBLEM_PHRASE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(?:problem|question)\s*#?\s*(\d{1,3})\b").expect("valid problem phrase regex")
});

/// 默认标签
pub const DEFAULT_LABEL: &str = "Problem";

/// 计算单元标签
///
/// 优先级：正文首行的合成标签 → 结构路径 → 正文里的 "Problem N" → `Problem`
pub fn label(unit: &Unit) -> String {
    let first_line = unit.body.lines().next().unwrap_or_default().trim();
    if LABEL_LINE.is_match(first_line) {
        return first_line.to_string();
    }

    if !unit.ordinal_path.is_empty() {
        return header_line(&unit.ordinal_path);
    }

    if let Some(n) = PROBLEM_PHRASE
        .captures(&unit.body)
        .and_then(|caps| caps.get(1))
    {
        return format!("Problem {}", n.as_str());
    }

    DEFAULT_LABEL.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::unit::Segment;

    #[test]
    fn test_label_from_header_line() {
        let unit = Unit::new(
            vec![Segment::Number(3), Segment::Letter('b'), Segment::Roman("ii".into())],
            "text",
        );
        assert_eq!(label(&unit), "Problem 3(b)(ii)");

        let window = Unit::new(vec![Segment::Part(4)], "text");
        assert_eq!(label(&window), "Part 4");
    }

    #[test]
    fn test_label_from_path_when_header_missing() {
        let unit = Unit {
            ordinal_path: vec![Segment::Number(2), Segment::Letter('c')],
            body: "no header here".to_string(),
        };
        assert_eq!(label(&unit), "Problem 2(c)");
    }

    #[test]
    fn test_label_from_problem_phrase() {
        let unit = Unit {
            ordinal_path: Vec::new(),
            body: "Homework set\nSee question #7 for the setup".to_string(),
        };
        assert_eq!(label(&unit), "Problem 7");
    }

    #[test]
    fn test_label_default() {
        let unit = Unit {
            ordinal_path: Vec::new(),
            body: String::new(),
        };
        assert_eq!(label(&unit), DEFAULT_LABEL);
    }

    #[test]
    fn test_malformed_header_is_not_trusted() {
        let unit = Unit {
            ordinal_path: Vec::new(),
            body: "Problem 1(zz)\nProblem 5 asks for x".to_string(),
        };
        assert_eq!(label(&unit), "Problem 1");
    }
}
