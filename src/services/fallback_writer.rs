//! 兜底文档 - 业务能力层
//!
//! 逐单元和整篇挽救都失败时，用正则扫描出的题号生成一份通用指导文档。
//! 只依赖材料里能识别出的标签，不依赖 Chunker，也不会失败。

use regex::Regex;
use std::sync::LazyLock;

use crate::models::document::AcceptedOutput;
use crate::models::tool::ToolProfile;

/// 行首题号或括号子问（字母和罗马数字都会匹配，按顺序再筛）
static LABEL_SCAN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?mi)^[ \t]*(?:(?:(?:problem|question)[ \t]+|q[ \t]*)?(\d{1,3})[.):](?:[ \t]|$)|\(([a-z]{1,4})\))")
        .expect("valid fallback label regex")
});

/// 没扫描到任何题号时使用的标签
pub const WHOLE_MATERIAL_LABEL: &str = "Your material";

/// 按小节位置给出的通用指导
const GENERIC_GUIDANCE: [[&str; 3]; 3] = [
    [
        "Restate the question in your own words before doing anything else.",
        "List every given quantity or fact and what the question wants you to produce.",
        "Note the units, constraints or keywords (\"explain\", \"derive\", \"compare\") that define a complete answer.",
    ],
    [
        "Identify which concept or formula from the course connects the givens to the goal.",
        "Write the general relationship first, then substitute the specifics of this problem.",
        "Work one step at a time and check each intermediate result for reasonableness.",
    ],
    [
        "Dropping units or mixing unit systems partway through.",
        "Answering a slightly different question than the one asked.",
        "Skipping the justification for a step that graders expect to see.",
    ],
];

/// 兜底文档生成器
#[derive(Debug, Clone, Copy, Default)]
pub struct FallbackWriter;

impl FallbackWriter {
    pub fn new() -> Self {
        Self
    }

    /// 生成兜底文档的各个小节
    ///
    /// # 参数
    /// - `material`: 原始材料
    /// - `profile`: 工具描述，决定小节标题
    /// - `limit`: 最多输出多少个标签块
    pub fn compose(&self, material: &str, profile: &ToolProfile, limit: usize) -> Vec<AcceptedOutput> {
        let mut labels = scan_labels(material);
        labels.truncate(limit.max(1));
        if labels.is_empty() {
            labels.push(WHOLE_MATERIAL_LABEL.to_string());
        }

        let intro = format!(
            "# {} (general guidance)\n\n\
             A tailored explanation could not be produced for this material, \
             so each item below lists general guidance for working through it.",
            profile.display_name
        );

        let mut outputs = vec![AcceptedOutput::unlabeled(intro)];
        outputs.extend(
            labels
                .into_iter()
                .map(|label| AcceptedOutput::new(label, guidance_block(profile))),
        );
        outputs
    }
}

/// 扫描材料中的题号标签，如 `Problem 1`、`Problem 1(a)`
///
/// 字母子问必须按 a、b、c 依次出现，不接续的括号项（如罗马数字小问）跳过。
pub fn scan_labels(material: &str) -> Vec<String> {
    let mut labels: Vec<String> = Vec::new();
    let mut current: Option<String> = None;
    let mut expected_letter = 'a';

    for caps in LABEL_SCAN.captures_iter(material) {
        let label = if let Some(num) = caps.get(1) {
            current = Some(num.as_str().to_string());
            expected_letter = 'a';
            format!("Problem {}", num.as_str())
        } else if let Some(part) = caps.get(2) {
            let mut chars = part.as_str().chars();
            let (Some(letter), None) = (chars.next().map(|c| c.to_ascii_lowercase()), chars.next())
            else {
                continue;
            };
            if letter != expected_letter {
                continue;
            }
            expected_letter = char::from_u32(u32::from(letter) + 1).unwrap_or('z');
            match &current {
                Some(num) => format!("Problem {}({})", num, letter),
                None => format!("Part ({})", letter),
            }
        } else {
            continue;
        };

        if !labels.contains(&label) {
            labels.push(label);
        }
    }

    // 有子问的题目只保留子问
    let parents_with_parts: Vec<String> = labels
        .iter()
        .filter_map(|l| l.split_once('(').map(|(parent, _)| parent.to_string()))
        .collect();
    labels.retain(|l| !parents_with_parts.contains(l));

    labels
}

fn guidance_block(profile: &ToolProfile) -> String {
    profile
        .sections
        .iter()
        .zip(GENERIC_GUIDANCE.iter())
        .map(|(section, bullets)| {
            let bullets = bullets
                .iter()
                .map(|b| format!("- {}", b))
                .collect::<Vec<_>>()
                .join("\n");
            format!("{}\n{}", section.heading, bullets)
        })
        .collect::<Vec<_>>()
        .join("\n\n")
}
