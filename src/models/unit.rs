//! 工作单元模型
//!
//! Chunker 的产物：一道题（或一个子问）及其结构路径

use serde::{Deserialize, Serialize};
use std::fmt;

/// 结构路径中的一段
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Segment {
    /// 顶层题号，如 `3.`
    Number(u32),
    /// 字母子问，如 `(b)`
    Letter(char),
    /// 罗马数字子问，如 `(ii)`
    Roman(String),
    /// 无结构材料的字符窗口序号（从 1 开始）
    Part(usize),
}

impl fmt::Display for Segment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Segment::Number(n) => write!(f, "{}", n),
            Segment::Letter(c) => write!(f, "({})", c),
            Segment::Roman(r) => write!(f, "({})", r),
            Segment::Part(p) => write!(f, "Part {}", p),
        }
    }
}

/// 工作单元
///
/// `body` 的第一行是 Chunker 合成的标签行（如 `Problem 1(a)(ii)` / `Part 3`），
/// 后续阶段不需要重新解析原文即可恢复结构。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Unit {
    pub ordinal_path: Vec<Segment>,
    pub body: String,
}

impl Unit {
    /// 根据路径和正文内容创建单元，自动加上标签行
    pub fn new(ordinal_path: Vec<Segment>, content: &str) -> Self {
        let header = header_line(&ordinal_path);
        let content = content.trim();
        let body = if content.is_empty() {
            header
        } else {
            format!("{}\n{}", header, content)
        };
        Self { ordinal_path, body }
    }

    /// 路径拼接成的短标签，如 `1(a)(ii)`；空路径返回 None
    pub fn path_label(&self) -> Option<String> {
        path_label(&self.ordinal_path)
    }

    /// 去掉标签行之后的正文
    pub fn content(&self) -> &str {
        match self.body.split_once('\n') {
            Some((_, rest)) => rest,
            None => "",
        }
    }

    /// 正文中非空白字符的数量（不含标签行）
    pub fn content_chars(&self) -> usize {
        non_whitespace_chars(self.content())
    }
}

/// 路径 → 短标签
pub fn path_label(path: &[Segment]) -> Option<String> {
    if path.is_empty() {
        return None;
    }
    Some(path.iter().map(ToString::to_string).collect())
}

/// 路径 → 正文首行的标签行
pub fn header_line(path: &[Segment]) -> String {
    match (path.first(), path_label(path)) {
        (Some(Segment::Part(_)), Some(label)) => label,
        (_, Some(label)) => format!("Problem {}", label),
        (_, None) => "Problem".to_string(),
    }
}

/// 非空白字符计数
pub fn non_whitespace_chars(text: &str) -> usize {
    text.chars().filter(|c| !c.is_whitespace()).count()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_header_line_for_nested_path() {
        let path = vec![
            Segment::Number(3),
            Segment::Letter('b'),
            Segment::Roman("ii".to_string()),
        ];
        assert_eq!(header_line(&path), "Problem 3(b)(ii)");
        assert_eq!(path_label(&path).as_deref(), Some("3(b)(ii)"));
    }

    #[test]
    fn test_part_header() {
        let unit = Unit::new(vec![Segment::Part(2)], "some text");
        assert_eq!(unit.body, "Part 2\nsome text");
        assert_eq!(unit.content(), "some text");
        assert_eq!(unit.content_chars(), 8);
    }

    #[test]
    fn test_empty_content_keeps_header_only() {
        let unit = Unit::new(vec![Segment::Number(1)], "   ");
        assert_eq!(unit.body, "Problem 1");
        assert_eq!(unit.content(), "");
        assert_eq!(unit.content_chars(), 0);
    }
}
