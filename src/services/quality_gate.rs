//! 质量闸门 - 业务能力层
//!
//! 生成结果在被采用之前必须通过的结构检查。
//! 模型在输出长度受限时经常不按格式写，这里拦下被截断、空泛或格式错误的输出。

use crate::config::PipelineConfig;
use crate::models::document::SENTINEL;
use crate::models::tool::ToolProfile;

/// 闸门检查结果
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GateReport {
    /// 缺失的小节（小写标记）
    pub missing_sections: Vec<String>,
    pub bullets: usize,
    pub chars: usize,
    pub min_bullets: usize,
    pub min_chars: usize,
}

impl GateReport {
    pub fn passed(&self) -> bool {
        self.missing_sections.is_empty()
            && self.bullets >= self.min_bullets
            && self.chars >= self.min_chars
    }

    /// 失败原因摘要（用于日志）
    pub fn summary(&self) -> String {
        let mut reasons = Vec::new();
        if !self.missing_sections.is_empty() {
            reasons.push(format!("缺少小节 {:?}", self.missing_sections));
        }
        if self.bullets < self.min_bullets {
            reasons.push(format!("要点 {}/{}", self.bullets, self.min_bullets));
        }
        if self.chars < self.min_chars {
            reasons.push(format!("长度 {}/{}", self.chars, self.min_chars));
        }
        if reasons.is_empty() {
            "通过".to_string()
        } else {
            reasons.join(", ")
        }
    }
}

/// 质量闸门
///
/// 无副作用，首次尝试、重试、整篇挽救使用同一个实例
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QualityGate {
    required_sections: Vec<String>,
    min_bullets: usize,
    min_chars: usize,
}

impl QualityGate {
    pub fn new(required_sections: Vec<String>, min_bullets: usize, min_chars: usize) -> Self {
        Self {
            required_sections: required_sections
                .into_iter()
                .map(|s| s.to_lowercase())
                .collect(),
            min_bullets,
            min_chars,
        }
    }

    /// 按工具的小节定义和配置的阈值创建
    pub fn for_tool(profile: &ToolProfile, config: &PipelineConfig) -> Self {
        Self::new(
            profile
                .sections
                .iter()
                .map(|s| s.marker.to_string())
                .collect(),
            config.gate_min_bullets,
            config.gate_min_chars,
        )
    }

    pub fn accepts(&self, output: &str) -> bool {
        self.evaluate(output).passed()
    }

    pub fn evaluate(&self, output: &str) -> GateReport {
        let body = strip_sentinel(output);
        let lower = body.to_lowercase();

        GateReport {
            missing_sections: self
                .required_sections
                .iter()
                .filter(|s| !lower.contains(s.as_str()))
                .cloned()
                .collect(),
            bullets: count_bullets(body),
            chars: body.chars().count(),
            min_bullets: self.min_bullets,
            min_chars: self.min_chars,
        }
    }
}

/// 去掉末尾的结束标记和空白
pub fn strip_sentinel(output: &str) -> &str {
    let mut body = output.trim_end();
    while let Some(rest) = body.strip_suffix(SENTINEL) {
        body = rest.trim_end();
    }
    body
}

/// 统计要点行：`-` / `*` / `•` / `1.` / `1)` 开头
pub fn count_bullets(text: &str) -> usize {
    text.lines().filter(|line| is_bullet(line.trim_start())).count()
}

fn is_bullet(line: &str) -> bool {
    if let Some(rest) = line
        .strip_prefix('-')
        .or_else(|| line.strip_prefix('*'))
        .or_else(|| line.strip_prefix('•'))
    {
        return rest.starts_with(char::is_whitespace) && !rest.trim().is_empty();
    }

    let digits = line.chars().take_while(|c| c.is_ascii_digit()).count();
    if digits == 0 || digits > 3 {
        return false;
    }
    let rest = &line[digits..];
    (rest.starts_with(". ") || rest.starts_with(") ")) && !rest[2..].trim().is_empty()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn gate() -> QualityGate {
        QualityGate::new(
            vec![
                "What is being asked".to_string(),
                "method".to_string(),
                "common pitfalls".to_string(),
            ],
            6,
            200,
        )
    }

    fn good_output() -> String {
        format!(
            "WHAT IS BEING ASKED\n- find the derivative of f(x) = x^2\n- identify the rule\n\
             Method / steps\n- apply the power rule to x^2\n- simplify the coefficient\n\
             1. check the domain\n\
             Common pitfalls\n- forgetting to lower the exponent\n- mixing up chain rule order\n{}\n{}",
            "extra explanation ".repeat(5),
            SENTINEL
        )
    }

    #[test]
    fn test_accepts_well_formed_output() {
        let report = gate().evaluate(&good_output());
        assert!(report.passed(), "{}", report.summary());
        assert_eq!(report.bullets, 7);
    }

    #[test]
    fn test_missing_any_section_rejects() {
        let good = good_output();
        for section in ["WHAT IS BEING ASKED", "Method", "Common pitfalls"] {
            // 其他条件远超阈值也不行
            let padded = format!("{}\n{}", good.replace(section, "Notes"), "- more\n".repeat(50));
            let report = gate().evaluate(&padded);
            assert!(!report.passed(), "should reject without {}", section);
            assert_eq!(report.missing_sections.len(), 1);
        }
    }

    #[test]
    fn test_too_few_bullets_rejects() {
        let text = format!(
            "What is being asked\nMethod\nCommon pitfalls\n- one\n- two\n{}",
            "prose ".repeat(100)
        );
        assert!(!gate().accepts(&text));
    }

    #[test]
    fn test_sentinel_does_not_count_towards_length() {
        let gate = QualityGate::new(Vec::new(), 0, 10);
        assert!(!gate.accepts(&format!("short\n{}", SENTINEL)));
        assert!(gate.accepts("long enough body"));
    }

    #[test]
    fn test_empty_output_rejected() {
        assert!(!gate().accepts(""));
        assert!(!gate().accepts(SENTINEL));
    }

    #[test]
    fn test_bullet_detection() {
        assert!(is_bullet("- item"));
        assert!(is_bullet("• item"));
        assert!(is_bullet("12) item"));
        assert!(!is_bullet("-"));
        assert!(!is_bullet("--- heading"));
        assert!(!is_bullet("1.5 kg"));
        assert!(!is_bullet("2024. year"));
        assert_eq!(count_bullets("  * nested\n* top\nplain"), 2);
    }

    #[test]
    fn test_strip_repeated_sentinels() {
        let text = format!("body\n{}\n\n{}\n", SENTINEL, SENTINEL);
        assert_eq!(strip_sentinel(&text), "body");
    }
}
