use std::collections::BTreeMap;
use std::str::FromStr;

use crate::error::ConfigError;
use crate::models::tool::{OutputBudgets, Tier, Tool};

/// 程序配置文件
#[derive(Clone, Debug)]
pub struct Config {
    /// 同时处理的请求数量
    pub max_concurrent_requests: usize,
    /// 请求 TOML 文件存放目录
    pub request_folder: String,
    /// 生成结果输出目录
    pub output_folder: String,
    /// 是否显示详细日志
    pub verbose_logging: bool,
    /// 输出日志文件
    pub output_log_file: String,
    // --- LLM 配置 ---
    pub llm_api_key: String,
    pub llm_api_base_url: String,
    pub llm_model_name: String,
    // --- 流水线配置 ---
    pub pipeline: PipelineConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            max_concurrent_requests: 4,
            request_folder: "requests".to_string(),
            output_folder: "output".to_string(),
            verbose_logging: false,
            output_log_file: "output.txt".to_string(),
            llm_api_key: String::new(),
            llm_api_base_url: "https://api.openai.com/v1".to_string(),
            llm_model_name: "gpt-4o-mini".to_string(),
            pipeline: PipelineConfig::default(),
        }
    }
}

impl Config {
    pub fn from_env() -> Self {
        let default = Self::default();
        Self {
            max_concurrent_requests: env_parse("MAX_CONCURRENT_REQUESTS", default.max_concurrent_requests),
            request_folder: std::env::var("REQUEST_FOLDER").unwrap_or(default.request_folder),
            output_folder: std::env::var("OUTPUT_FOLDER").unwrap_or(default.output_folder),
            verbose_logging: env_parse("VERBOSE_LOGGING", default.verbose_logging),
            output_log_file: std::env::var("OUTPUT_LOG_FILE").unwrap_or(default.output_log_file),
            llm_api_key: std::env::var("LLM_API_KEY").unwrap_or(default.llm_api_key),
            llm_api_base_url: std::env::var("LLM_API_BASE_URL").unwrap_or(default.llm_api_base_url),
            llm_model_name: std::env::var("LLM_MODEL_NAME").unwrap_or(default.llm_model_name),
            pipeline: PipelineConfig::from_env(),
        }
    }

    /// 启动时校验，失败即终止
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.llm_api_key.trim().is_empty() {
            return Err(ConfigError::MissingCredentials {
                var_name: "LLM_API_KEY".to_string(),
            });
        }
        self.validate_limits()
    }

    /// 校验除凭证以外的所有配置项
    pub fn validate_limits(&self) -> Result<(), ConfigError> {
        if self.max_concurrent_requests == 0 {
            return Err(invalid("MAX_CONCURRENT_REQUESTS", 0, "必须大于 0"));
        }
        self.pipeline.validate()
    }
}

/// 流水线可调参数
///
/// 所有选项在编排层入口处校验一次
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PipelineConfig {
    /// 材料最少有效字符数，低于此值直接拒绝
    pub min_material_chars: usize,
    /// 单元最少有效字符数，低于此值的单元被丢弃
    pub min_unit_chars: usize,
    /// 无结构材料的窗口字符上限
    pub max_window_chars: usize,
    /// 质量闸门：最少要点数
    pub gate_min_bullets: usize,
    /// 质量闸门：最少字符数
    pub gate_min_chars: usize,
    /// 普通用户每次请求最多处理的单元数
    pub free_unit_cap: usize,
    /// 高级用户每次请求最多处理的单元数
    pub privileged_unit_cap: usize,
    /// 单个请求内同时进行的单元生成数
    pub max_concurrent_units: usize,
    /// 单次 LLM 调用超时（秒）
    pub llm_timeout_secs: u64,
    /// 各工具的输出预算
    pub tool_budgets: BTreeMap<Tool, OutputBudgets>,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            min_material_chars: 80,
            min_unit_chars: 80,
            max_window_chars: 2400,
            gate_min_bullets: 6,
            gate_min_chars: 300,
            free_unit_cap: 6,
            privileged_unit_cap: 30,
            max_concurrent_units: 4,
            llm_timeout_secs: 60,
            tool_budgets: Tool::ALL
                .into_iter()
                .map(|tool| (tool, tool.profile().budgets))
                .collect(),
        }
    }
}

impl PipelineConfig {
    pub fn from_env() -> Self {
        let default = Self::default();
        Self {
            min_material_chars: env_parse("MIN_MATERIAL_CHARS", default.min_material_chars),
            min_unit_chars: env_parse("MIN_UNIT_CHARS", default.min_unit_chars),
            max_window_chars: env_parse("MAX_WINDOW_CHARS", default.max_window_chars),
            gate_min_bullets: env_parse("GATE_MIN_BULLETS", default.gate_min_bullets),
            gate_min_chars: env_parse("GATE_MIN_CHARS", default.gate_min_chars),
            free_unit_cap: env_parse("FREE_UNIT_CAP", default.free_unit_cap),
            privileged_unit_cap: env_parse("PRIVILEGED_UNIT_CAP", default.privileged_unit_cap),
            max_concurrent_units: env_parse("MAX_CONCURRENT_UNITS", default.max_concurrent_units),
            llm_timeout_secs: env_parse("LLM_TIMEOUT_SECS", default.llm_timeout_secs),
            tool_budgets: default.tool_budgets,
        }
    }

    /// 该等级每次请求最多处理的单元数
    pub fn unit_cap(&self, tier: Tier) -> usize {
        match tier {
            Tier::Free => self.free_unit_cap,
            Tier::Privileged => self.privileged_unit_cap,
        }
    }

    /// 该工具的输出预算，未配置时使用工具默认值
    pub fn budgets_for(&self, tool: Tool) -> OutputBudgets {
        self.tool_budgets
            .get(&tool)
            .copied()
            .unwrap_or_else(|| tool.profile().budgets)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_window_chars == 0 {
            return Err(invalid("MAX_WINDOW_CHARS", 0, "必须大于 0"));
        }
        if self.min_unit_chars >= self.max_window_chars {
            return Err(invalid(
                "MIN_UNIT_CHARS",
                self.min_unit_chars,
                "必须小于 MAX_WINDOW_CHARS",
            ));
        }
        if self.free_unit_cap == 0 {
            return Err(invalid("FREE_UNIT_CAP", 0, "必须大于 0"));
        }
        if self.privileged_unit_cap < self.free_unit_cap {
            return Err(invalid(
                "PRIVILEGED_UNIT_CAP",
                self.privileged_unit_cap,
                "不能小于 FREE_UNIT_CAP",
            ));
        }
        if self.max_concurrent_units == 0 {
            return Err(invalid("MAX_CONCURRENT_UNITS", 0, "必须大于 0"));
        }
        if self.llm_timeout_secs == 0 {
            return Err(invalid("LLM_TIMEOUT_SECS", 0, "必须大于 0"));
        }
        for (tool, budgets) in &self.tool_budgets {
            if budgets.unit == 0 || budgets.retry < budgets.unit || budgets.salvage == 0 {
                return Err(invalid(
                    "tool_budgets",
                    format!("{}: {:?}", tool.code(), budgets),
                    "预算必须大于 0，且重试预算不能小于单元预算",
                ));
            }
        }
        Ok(())
    }
}

fn env_parse<T: FromStr>(name: &str, default: T) -> T {
    std::env::var(name)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

fn invalid(name: &str, value: impl ToString, reason: &str) -> ConfigError {
    ConfigError::InvalidValue {
        name: name.to_string(),
        value: value.to_string(),
        reason: reason.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_pipeline_is_valid() {
        assert!(PipelineConfig::default().validate().is_ok());
    }

    #[test]
    fn test_missing_key_is_fatal() {
        let config = Config::default();
        assert!(matches!(
            config.validate(),
            Err(ConfigError::MissingCredentials { .. })
        ));

        let config = Config {
            llm_api_key: "sk-test".to_string(),
            ..Config::default()
        };
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_unit_caps_by_tier() {
        let pipeline = PipelineConfig::default();
        assert_eq!(pipeline.unit_cap(Tier::Free), 6);
        assert_eq!(pipeline.unit_cap(Tier::Privileged), 30);
    }

    #[test]
    fn test_bad_budget_rejected() {
        let mut pipeline = PipelineConfig::default();
        pipeline.tool_budgets.insert(
            Tool::StudyGuide,
            OutputBudgets {
                unit: 600,
                retry: 100,
                salvage: 1500,
            },
        );
        assert!(matches!(
            pipeline.validate(),
            Err(ConfigError::InvalidValue { .. })
        ));
    }

    #[test]
    fn test_window_must_exceed_unit_minimum() {
        let pipeline = PipelineConfig {
            min_unit_chars: 500,
            max_window_chars: 400,
            ..PipelineConfig::default()
        };
        assert!(pipeline.validate().is_err());
    }
}
