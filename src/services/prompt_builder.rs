//! 提示词构建 - 业务能力层
//!
//! 只负责把单元 / 整篇材料组装成 `GenerationRequest`，不调用模型

use regex::Regex;
use std::sync::LazyLock;

use crate::models::document::SENTINEL;
use crate::models::generation::{GenerationRequest, RoleSegment};
use crate::models::request::GenerationOptions;
use crate::models::tool::{OutputBudgets, ToolProfile};
use crate::models::unit::Unit;

/// 含 `=` 的类公式片段
static EQUATION: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"[^\n.;:?!]{0,40}[^\s=<>!]\s*=\s*[^\s=][^\n.;:?!]{0,40}").expect("valid equation regex")
});

/// 锚点片段数量上下限
const MIN_ANCHORS: usize = 2;
const MAX_ANCHORS: usize = 4;
/// 句子锚点长度范围（字符）
const ANCHOR_MIN_CHARS: usize = 12;
const ANCHOR_MAX_CHARS: usize = 120;
/// 整篇挽救时材料最多放入的字符数
const SALVAGE_MATERIAL_CHARS: usize = 12_000;

const SYSTEM_PERSONA: &str = "You are a patient, rigorous tutor who writes structured study material. \
You teach the method, never just the result.";

/// 提示词构建器
#[derive(Debug, Clone)]
pub struct PromptBuilder {
    profile: ToolProfile,
    budgets: OutputBudgets,
    min_bullets: usize,
    options: GenerationOptions,
}

impl PromptBuilder {
    pub fn new(
        profile: ToolProfile,
        budgets: OutputBudgets,
        min_bullets: usize,
        options: GenerationOptions,
    ) -> Self {
        Self {
            profile,
            budgets,
            min_bullets,
            options,
        }
    }

    /// 单元首次尝试的请求
    pub fn unit_request(&self, unit: &Unit, label: &str) -> GenerationRequest {
        let anchors = extract_anchors(unit.content());
        GenerationRequest::new(
            vec![
                RoleSegment::system(SYSTEM_PERSONA),
                RoleSegment::developer(self.unit_instruction(label, &anchors)),
                RoleSegment::user(self.unit_message(unit, label)),
            ],
            self.budgets.unit,
        )
    }

    /// 单元重试的请求：同样的指令段，后面追加 CRITICAL 段
    pub fn escalated_request(&self, unit: &Unit, label: &str) -> GenerationRequest {
        let anchors = extract_anchors(unit.content());
        let instruction = format!(
            "{}\n\n{}",
            self.unit_instruction(label, &anchors),
            self.critical_block()
        );
        GenerationRequest::new(
            vec![
                RoleSegment::system(SYSTEM_PERSONA),
                RoleSegment::developer(instruction),
                RoleSegment::user(self.unit_message(unit, label)),
            ],
            self.budgets.retry.max(self.budgets.unit),
        )
    }

    /// 整篇挽救请求：要求放宽到至少覆盖两道不同的题
    pub fn salvage_request(&self, material: &str) -> GenerationRequest {
        let material: String = material.chars().take(SALVAGE_MATERIAL_CHARS).collect();
        let instruction = format!(
            "Task: {task}\n\
             The material below could not be split into individual problems. \
             Cover AT LEAST TWO distinct problems or topics from it; full coverage is not required.\n\
             For each one, start with a heading naming it, then write these sections in this order:\n\
             {sections}\n\
             Use at least {bullets} bullet points (lines starting with \"- \") overall.\n\
             Quote short fragments of the material so the answer is clearly about THIS material.\n\
             Do NOT state final numeric answers; explain how to get them.\n\
             End your reply with a line containing exactly {sentinel}",
            task = self.profile.task,
            sections = self.section_list(),
            bullets = self.min_bullets,
            sentinel = SENTINEL,
        );
        GenerationRequest::new(
            vec![
                RoleSegment::system(SYSTEM_PERSONA),
                RoleSegment::developer(instruction),
                RoleSegment::user(format!(
                    "{}Material:\n{}",
                    self.options_preamble(),
                    material
                )),
            ],
            self.budgets.salvage,
        )
    }

    fn unit_instruction(&self, label: &str, anchors: &[String]) -> String {
        let anchor_rule = if anchors.is_empty() {
            format!(
                "Quote at least {} short verbatim fragments of the problem text in your explanation.",
                MIN_ANCHORS
            )
        } else {
            format!(
                "Reference at least {} of these fragments verbatim or near-verbatim:\n{}",
                MIN_ANCHORS.min(anchors.len()),
                anchors
                    .iter()
                    .map(|a| format!("  \"{}\"", a))
                    .collect::<Vec<_>>()
                    .join("\n")
            )
        };

        format!(
            "Task: {task}\n\
             You are writing the section for {label}.\n\
             Write these sections, with these exact headings, in this order:\n\
             {sections}\n\
             Use at least {bullets} bullet points (lines starting with \"- \") in total.\n\
             Do not be generic: every bullet must be about this specific problem. {anchor_rule}\n\
             Do NOT give final numeric answers or the final result; explain how to reach it.\n\
             End your reply with a line containing exactly {sentinel}",
            task = self.profile.task,
            label = label,
            sections = self.section_list(),
            bullets = self.min_bullets,
            anchor_rule = anchor_rule,
            sentinel = SENTINEL,
        )
    }

    fn critical_block(&self) -> String {
        format!(
            "CRITICAL: your previous answer was rejected because it did not follow the required structure.\n\
             - You MUST include ALL of these headings: {headings}.\n\
             - You MUST write at least {bullets} bullet points starting with \"- \".\n\
             - You MUST quote at least {more} fragments of the problem text.\n\
             - Keep each bullet short so the whole answer fits; never stop before the last section.",
            headings = self
                .profile
                .sections
                .iter()
                .map(|s| s.heading)
                .collect::<Vec<_>>()
                .join(", "),
            bullets = self.min_bullets,
            more = MIN_ANCHORS + 1,
        )
    }

    fn unit_message(&self, unit: &Unit, label: &str) -> String {
        format!(
            "{}{}:\n{}",
            self.options_preamble(),
            label,
            unit.content()
        )
    }

    fn options_preamble(&self) -> String {
        let mut preamble = String::new();
        if let Some(exam_type) = &self.options.exam_type {
            preamble.push_str(&format!("Exam type: {}\n", exam_type));
        }
        if let Some(emphasis) = &self.options.prof_emphasis {
            preamble.push_str(&format!("Professor emphasis: {}\n", emphasis));
        }
        if !preamble.is_empty() {
            preamble.push('\n');
        }
        preamble
    }

    fn section_list(&self) -> String {
        self.profile
            .sections
            .iter()
            .enumerate()
            .map(|(i, s)| format!("{}. {}", i + 1, s.heading))
            .collect::<Vec<_>>()
            .join("\n")
    }
}

/// 从单元正文中挑 2–4 个锚点片段，优先含 `=` 的公式
///
/// 启发式，不保证片段有意义
pub fn extract_anchors(text: &str) -> Vec<String> {
    let mut anchors: Vec<String> = Vec::new();

    for m in EQUATION.find_iter(text) {
        if anchors.len() >= MAX_ANCHORS {
            return anchors;
        }
        push_anchor(&mut anchors, m.as_str());
    }

    for sentence in text.split(|c| matches!(c, '.' | '?' | '!' | '\n')) {
        if anchors.len() >= MAX_ANCHORS {
            break;
        }
        let sentence = sentence.trim();
        if sentence.chars().count() < ANCHOR_MIN_CHARS || sentence.contains('=') {
            continue;
        }
        push_anchor(&mut anchors, sentence);
    }

    anchors
}

fn push_anchor(anchors: &mut Vec<String>, candidate: &str) {
    let candidate = candidate.trim();
    let chars = candidate.chars().count();
    if chars < 3 || chars > ANCHOR_MAX_CHARS {
        return;
    }
    if !anchors.iter().any(|a| a == candidate) {
        anchors.push(candidate.to_string());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::generation::Role;
    use crate::models::tool::Tool;
    use crate::models::unit::Segment;

    fn builder(options: GenerationOptions) -> PromptBuilder {
        let profile = Tool::ProblemWalkthrough.profile();
        PromptBuilder::new(profile, profile.budgets, 6, options)
    }

    fn unit() -> Unit {
        Unit::new(
            vec![Segment::Number(1), Segment::Letter('a')],
            "1. A ball is thrown upward.\n(a) Given v = v0 - g*t, find when the ball stops rising.",
        )
    }

    #[test]
    fn test_anchors_prefer_equations() {
        let anchors = extract_anchors("Let F = m*a for the cart. The cart moves along a rail. Then p = m*v.");
        assert!(anchors.len() >= 2 && anchors.len() <= MAX_ANCHORS);
        assert!(anchors[0].contains('='));
        assert!(anchors[1].contains('='));
    }

    #[test]
    fn test_anchors_from_sentences() {
        let anchors = extract_anchors(
            "Describe the causes of the French Revolution.\nCompare them with the American Revolution.",
        );
        assert_eq!(anchors.len(), 2);
        assert_eq!(anchors[0], "Describe the causes of the French Revolution");
    }

    #[test]
    fn test_anchors_capped() {
        let text = "a = 1. b = 2. c = 3. d = 4. e = 5. f = 6.";
        assert_eq!(extract_anchors(text).len(), MAX_ANCHORS);
        assert!(extract_anchors("").is_empty());
    }

    #[test]
    fn test_unit_request_shape() {
        let request = builder(GenerationOptions::default()).unit_request(&unit(), "Problem 1(a)");
        let roles: Vec<Role> = request.role_segments.iter().map(|s| s.role).collect();
        assert_eq!(roles, vec![Role::System, Role::Developer, Role::User]);
        assert_eq!(request.output_budget, 550);

        let instruction = request.instruction().unwrap();
        assert!(instruction.contains("Problem 1(a)"));
        assert!(instruction.contains("What is being asked"));
        assert!(instruction.contains("Common pitfalls"));
        assert!(instruction.contains("v = v0 - g*t"));
        assert!(instruction.contains("Do NOT give final numeric answers"));
        assert!(instruction.contains(SENTINEL));
        assert!(!instruction.contains("CRITICAL"));
    }

    #[test]
    fn test_escalated_request_extends_instruction() {
        let b = builder(GenerationOptions::default());
        let first = b.unit_request(&unit(), "Problem 1(a)");
        let retry = b.escalated_request(&unit(), "Problem 1(a)");

        let first_instruction = first.instruction().unwrap();
        let retry_instruction = retry.instruction().unwrap();
        assert!(retry_instruction.starts_with(first_instruction));
        assert!(retry_instruction.contains("CRITICAL"));
        assert!(retry.output_budget >= first.output_budget);
        // 只有指令段不同
        assert_eq!(first.role_segments[0], retry.role_segments[0]);
        assert_eq!(first.role_segments[2], retry.role_segments[2]);
    }

    #[test]
    fn test_options_reach_user_message() {
        let options = GenerationOptions {
            exam_type: Some("final".to_string()),
            prof_emphasis: Some("free body diagrams".to_string()),
            ..GenerationOptions::default()
        };
        let request = builder(options).unit_request(&unit(), "Problem 1(a)");
        let user = &request.role_segments[2].text;
        assert!(user.contains("Exam type: final"));
        assert!(user.contains("Professor emphasis: free body diagrams"));
        assert!(user.contains("(a) Given v = v0 - g*t"));
        assert!(!user.starts_with("Problem 1(a)\n1."));
    }

    #[test]
    fn test_salvage_request_is_relaxed() {
        let request = builder(GenerationOptions::default()).salvage_request("whole material");
        assert_eq!(request.output_budget, 1500);
        let instruction = request.instruction().unwrap();
        assert!(instruction.contains("AT LEAST TWO distinct problems"));
        assert!(request.role_segments[2].text.contains("whole material"));
    }
}
