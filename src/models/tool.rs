//! 工具与用户等级

use serde::{Deserialize, Serialize};

/// 可生成的学习产物类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Tool {
    /// 逐题讲解
    ProblemWalkthrough,
    /// 学习指南
    StudyGuide,
    /// 公式表
    FormulaSheet,
    /// 考前冲刺（仅高级用户）
    ExamCram,
}

/// 别名表（小写）
static TOOL_ALIASES: phf::Map<&'static str, Tool> = phf::phf_map! {
    "problem_walkthrough" => Tool::ProblemWalkthrough,
    "walkthrough" => Tool::ProblemWalkthrough,
    "homework" => Tool::ProblemWalkthrough,
    "explain" => Tool::ProblemWalkthrough,
    "study_guide" => Tool::StudyGuide,
    "guide" => Tool::StudyGuide,
    "formula_sheet" => Tool::FormulaSheet,
    "formulas" => Tool::FormulaSheet,
    "cheatsheet" => Tool::FormulaSheet,
    "exam_cram" => Tool::ExamCram,
    "cram" => Tool::ExamCram,
};

/// 质量闸门要求的一个小节
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SectionSpec {
    /// 提示词里要求的标题
    pub heading: &'static str,
    /// 闸门检查用的小写子串
    pub marker: &'static str,
}

/// 输出长度预算（token）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutputBudgets {
    pub unit: u32,
    pub retry: u32,
    pub salvage: u32,
}

/// 工具的静态描述
#[derive(Debug, Clone, Copy)]
pub struct ToolProfile {
    pub display_name: &'static str,
    /// 写进提示词的任务说明
    pub task: &'static str,
    pub sections: [SectionSpec; 3],
    pub budgets: OutputBudgets,
    pub privileged_only: bool,
}

const PITFALLS: SectionSpec = SectionSpec {
    heading: "Common pitfalls",
    marker: "common pitfalls",
};

const ASKED: SectionSpec = SectionSpec {
    heading: "What is being asked",
    marker: "what is being asked",
};

const METHOD: SectionSpec = SectionSpec {
    heading: "Method / steps",
    marker: "method",
};

impl Tool {
    pub const ALL: [Tool; 4] = [
        Tool::ProblemWalkthrough,
        Tool::StudyGuide,
        Tool::FormulaSheet,
        Tool::ExamCram,
    ];

    /// 解析工具名（大小写、连字符、空格不敏感）
    pub fn from_str(s: &str) -> Option<Self> {
        let key = s.trim().to_lowercase().replace(['-', ' '], "_");
        TOOL_ALIASES.get(key.as_str()).copied()
    }

    /// 标准名称
    pub fn code(self) -> &'static str {
        match self {
            Tool::ProblemWalkthrough => "problem_walkthrough",
            Tool::StudyGuide => "study_guide",
            Tool::FormulaSheet => "formula_sheet",
            Tool::ExamCram => "exam_cram",
        }
    }

    pub fn profile(self) -> ToolProfile {
        match self {
            Tool::ProblemWalkthrough => ToolProfile {
                display_name: "Problem walkthrough",
                task: "Explain how to approach this problem step by step so the student can solve it themselves.",
                sections: [ASKED, METHOD, PITFALLS],
                budgets: OutputBudgets {
                    unit: 550,
                    retry: 700,
                    salvage: 1500,
                },
                privileged_only: false,
            },
            Tool::StudyGuide => ToolProfile {
                display_name: "Study guide",
                task: "Turn this material into a focused study guide: the concepts it tests and how to apply them.",
                sections: [
                    SectionSpec {
                        heading: "Key concepts",
                        marker: "key concepts",
                    },
                    SectionSpec {
                        heading: "How to apply",
                        marker: "how to apply",
                    },
                    PITFALLS,
                ],
                budgets: OutputBudgets {
                    unit: 600,
                    retry: 750,
                    salvage: 1600,
                },
                privileged_only: false,
            },
            Tool::FormulaSheet => ToolProfile {
                display_name: "Formula sheet",
                task: "Extract the formulas and relationships this material relies on, with when each one applies.",
                sections: [
                    SectionSpec {
                        heading: "Formulas",
                        marker: "formula",
                    },
                    SectionSpec {
                        heading: "When to use",
                        marker: "when to use",
                    },
                    PITFALLS,
                ],
                budgets: OutputBudgets {
                    unit: 450,
                    retry: 600,
                    salvage: 1400,
                },
                privileged_only: false,
            },
            Tool::ExamCram => ToolProfile {
                display_name: "Exam cram",
                task: "Prepare the student for an exam question like this one: what graders look for and the fastest reliable method.",
                sections: [ASKED, METHOD, PITFALLS],
                budgets: OutputBudgets {
                    unit: 650,
                    retry: 800,
                    salvage: 1600,
                },
                privileged_only: true,
            },
        }
    }
}

impl std::fmt::Display for Tool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.profile().display_name)
    }
}

/// 用户等级，决定每次请求最多处理多少个单元
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Tier {
    #[default]
    Free,
    Privileged,
}

impl Tier {
    pub fn from_str(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "free" => Some(Tier::Free),
            "privileged" | "pro" | "premium" => Some(Tier::Privileged),
            _ => None,
        }
    }

    pub fn is_privileged(self) -> bool {
        matches!(self, Tier::Privileged)
    }
}
