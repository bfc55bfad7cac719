//! 材料切分 - 业务能力层
//!
//! 把一整块材料切成有序的工作单元（题目 / 子问）。
//!
//! ## 三级检测
//!
//! ```text
//! 1. Foo            ← 顶层题号      [1]
//! (a) Bar           ← 字母子问      [1, a]
//! (i) ...           ← 罗马数字子问  [1, a, i]
//! (ii) ...          ←               [1, a, ii]
//! (b) Baz           ←               [1, b]
//! 2. Qux            ←               [2]
//! ```
//!
//! 只在检测到结构的层级继续往下切；完全没有题号的材料走按字符数切窗口的兜底切分。
//! 对非空输入永远至少返回一个单元。

use regex::Regex;
use std::sync::LazyLock;

use crate::config::PipelineConfig;
use crate::models::unit::{non_whitespace_chars, Segment, Unit};

/// 行首顶层题号：`1.` / `2)` / `Problem 3:` / `Q4.`
static TOP_MARKER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?mi)^[ \t]*(?:(?:problem|question)[ \t]+|q[ \t]*)?(\d{1,3})[.):](?:[ \t]+|$)")
        .expect("valid top-level marker regex")
});

/// 行首字母子问：`(a)`，也允许和题号写在同一行：`1. (a)`
static LETTER_MARKER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?m)^[ \t]*(?:\d{1,3}[.):][ \t]*)?\(([a-z])\)").expect("valid letter marker regex")
});

/// 行首罗马数字子问：`(i)` … `(x)`
static ROMAN_MARKER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?m)^[ \t]*\((i{1,3}|iv|vi{0,3}|ix|x)\)").expect("valid roman marker regex")
});

const ROMANS: [&str; 10] = ["i", "ii", "iii", "iv", "v", "vi", "vii", "viii", "ix", "x"];

/// 一个检测到的标记：起始字节位置 + 路径段
#[derive(Debug, Clone, PartialEq, Eq)]
struct Marker {
    start: usize,
    segment: Segment,
}

/// 材料切分器
#[derive(Debug, Clone)]
pub struct Chunker {
    min_unit_chars: usize,
    max_window_chars: usize,
}

impl Chunker {
    pub fn new(min_unit_chars: usize, max_window_chars: usize) -> Self {
        Self {
            min_unit_chars,
            max_window_chars: max_window_chars.max(1),
        }
    }

    pub fn from_config(config: &PipelineConfig) -> Self {
        Self::new(config.min_unit_chars, config.max_window_chars)
    }

    /// 切分材料
    ///
    /// 空输入返回空列表；其他任何输入至少返回一个单元，且不会失败
    pub fn chunk(&self, raw: &str) -> Vec<Unit> {
        if raw.is_empty() {
            return Vec::new();
        }

        let text = normalize(raw);
        if text.is_empty() {
            return vec![Unit::new(vec![Segment::Part(1)], "")];
        }

        let kept: Vec<Unit> = self
            .structured_units(&text)
            .into_iter()
            .filter(|u| u.content_chars() >= self.min_unit_chars)
            .collect();
        if !kept.is_empty() {
            return kept;
        }

        let windows = self.window_units(&text);
        if windows.is_empty() {
            vec![Unit::new(vec![Segment::Part(1)], &text)]
        } else {
            windows
        }
    }

    /// 按题号结构切分；没有顶层题号时返回空
    fn structured_units(&self, text: &str) -> Vec<Unit> {
        let tops = top_level_markers(text);
        let mut units = Vec::new();

        for (segment_text, marker) in sections(text, &tops) {
            let path = vec![marker.segment.clone()];
            let letters = letter_markers(segment_text);

            if letters.is_empty() {
                units.push(Unit::new(path, segment_text));
                continue;
            }

            let stem = &segment_text[..letters[0].start];
            for (letter_text, letter) in sections(segment_text, &letters) {
                let mut letter_path = path.clone();
                letter_path.push(letter.segment.clone());

                let romans = roman_markers(letter_text);
                if romans.is_empty() {
                    units.push(Unit::new(letter_path, &join_context(&[stem, letter_text])));
                    continue;
                }

                let letter_stem = &letter_text[..romans[0].start];
                for (roman_text, roman) in sections(letter_text, &romans) {
                    let mut roman_path = letter_path.clone();
                    roman_path.push(roman.segment.clone());
                    units.push(Unit::new(
                        roman_path,
                        &join_context(&[stem, letter_stem, roman_text]),
                    ));
                }
            }
        }

        units
    }

    /// 兜底切分：按行累积，每个窗口不超过 `max_window_chars` 个字符
    fn window_units(&self, text: &str) -> Vec<Unit> {
        let max = self.max_window_chars;
        let mut windows: Vec<String> = Vec::new();
        let mut current = String::new();
        let mut current_chars = 0usize;

        for line in text.lines() {
            for piece in split_long_line(line, max) {
                if current.is_empty() && piece.trim().is_empty() {
                    continue;
                }
                let piece_chars = piece.chars().count();
                if !current.is_empty() && current_chars + 1 + piece_chars > max {
                    windows.push(std::mem::take(&mut current));
                    current_chars = 0;
                    if piece.trim().is_empty() {
                        continue;
                    }
                }
                if !current.is_empty() {
                    current.push('\n');
                    current_chars += 1;
                }
                current.push_str(piece);
                current_chars += piece_chars;
            }
        }
        if !current.trim().is_empty() {
            windows.push(current);
        }

        // 过短的尾巴并入前一个窗口
        if windows.len() >= 2 {
            let tail_is_short = windows
                .last()
                .map(|w| non_whitespace_chars(w) < self.min_unit_chars)
                .unwrap_or(false);
            if tail_is_short {
                if let Some(tail) = windows.pop() {
                    if let Some(prev) = windows.last_mut() {
                        prev.push('\n');
                        prev.push_str(tail.trim_end());
                    }
                }
            }
        }

        windows
            .iter()
            .enumerate()
            .map(|(i, w)| Unit::new(vec![Segment::Part(i + 1)], w))
            .collect()
    }
}

impl Default for Chunker {
    fn default() -> Self {
        Self::from_config(&PipelineConfig::default())
    }
}

/// 规范化空白：统一换行、去掉行尾空白、连续空行合并为一个
pub fn normalize(raw: &str) -> String {
    let text = raw
        .replace("\r\n", "\n")
        .replace(['\r', '\x0c'], "\n");

    let mut out = String::with_capacity(text.len());
    let mut blank_run = 0usize;
    for line in text.lines() {
        let line = line.trim_end();
        if line.is_empty() {
            blank_run += 1;
            if blank_run > 1 {
                continue;
            }
        } else {
            blank_run = 0;
        }
        out.push_str(line);
        out.push('\n');
    }

    out.trim().to_string()
}

/// 顶层题号：第一个之后必须逐一递增，正文里零散的编号列表会被忽略
fn top_level_markers(text: &str) -> Vec<Marker> {
    let mut markers = Vec::new();
    let mut expected: Option<u32> = None;

    for caps in TOP_MARKER.captures_iter(text) {
        let (Some(whole), Some(num)) = (caps.get(0), caps.get(1)) else {
            continue;
        };
        let Ok(n) = num.as_str().parse::<u32>() else {
            continue;
        };
        if expected.is_some_and(|e| e != n) {
            continue;
        }
        expected = Some(n + 1);
        markers.push(Marker {
            start: whole.start(),
            segment: Segment::Number(n),
        });
    }

    markers
}

/// 字母子问：必须从 `(a)` 开始按字母顺序出现
fn letter_markers(text: &str) -> Vec<Marker> {
    let mut markers = Vec::new();
    let mut expected = 'a';

    for caps in LETTER_MARKER.captures_iter(text) {
        let (Some(whole), Some(letter)) = (caps.get(0), caps.get(1)) else {
            continue;
        };
        let Some(c) = letter.as_str().chars().next() else {
            continue;
        };
        if c != expected {
            continue;
        }
        markers.push(Marker {
            start: whole.start(),
            segment: Segment::Letter(c),
        });
        expected = match char::from_u32(u32::from(c) + 1) {
            Some(next) => next,
            None => break,
        };
    }

    markers
}

/// 罗马数字子问：必须从 `(i)` 开始按顺序出现
///
/// `text` 以字母子问自己的标记开头，位置 0 上的 `(i)` 是字母而不是罗马数字
fn roman_markers(text: &str) -> Vec<Marker> {
    let mut markers = Vec::new();
    let mut expected = 0usize;

    for caps in ROMAN_MARKER.captures_iter(text) {
        let (Some(whole), Some(numeral)) = (caps.get(0), caps.get(1)) else {
            continue;
        };
        if whole.start() == 0 {
            continue;
        }
        if ROMANS.get(expected) != Some(&numeral.as_str()) {
            continue;
        }
        markers.push(Marker {
            start: whole.start(),
            segment: Segment::Roman(numeral.as_str().to_string()),
        });
        expected += 1;
    }

    markers
}

/// 按标记位置切成 (片段, 标记) 对；第一个标记之前的内容不在结果中
fn sections<'a, 'm>(text: &'a str, markers: &'m [Marker]) -> Vec<(&'a str, &'m Marker)> {
    markers
        .iter()
        .enumerate()
        .map(|(i, marker)| {
            let end = markers.get(i + 1).map(|m| m.start).unwrap_or(text.len());
            (&text[marker.start..end], marker)
        })
        .collect()
}

/// 把上级题干和本级内容拼在一起，空片段跳过
fn join_context(parts: &[&str]) -> String {
    parts
        .iter()
        .map(|p| p.trim())
        .filter(|p| !p.is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}

/// 超长的一行按字符数硬切，尽量在空白处断开
fn split_long_line(line: &str, max: usize) -> Vec<&str> {
    let mut pieces = Vec::new();
    let mut rest = line;

    while rest.chars().count() > max {
        let hard_cut = rest
            .char_indices()
            .nth(max)
            .map(|(i, _)| i)
            .unwrap_or(rest.len());
        let cut = match rest[..hard_cut].rfind(char::is_whitespace) {
            Some(ws) if ws > hard_cut / 2 => ws,
            _ => hard_cut,
        };
        let (piece, tail) = rest.split_at(cut);
        pieces.push(piece.trim_end());
        rest = tail.trim_start();
    }

    if !rest.is_empty() || pieces.is_empty() {
        pieces.push(rest);
    }
    pieces
}
