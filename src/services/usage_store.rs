//! 使用次数记录 - 业务能力层
//!
//! 只提供计数能力，重置和持久化由外部负责

use std::collections::HashMap;
use std::sync::Mutex;

/// 按会话键记录生成次数
pub trait UsageStore: Send + Sync {
    /// 当前计数，未出现过的键为 0
    fn get(&self, key: &str) -> u64;

    /// 计数加一，返回新值
    fn increment(&self, key: &str) -> u64;
}

/// 进程内计数
#[derive(Debug, Default)]
pub struct InMemoryUsageStore {
    counts: Mutex<HashMap<String, u64>>,
}

impl InMemoryUsageStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl UsageStore for InMemoryUsageStore {
    fn get(&self, key: &str) -> u64 {
        // 计数器被污染时照常读取
        let counts = self.counts.lock().unwrap_or_else(|e| e.into_inner());
        counts.get(key).copied().unwrap_or(0)
    }

    fn increment(&self, key: &str) -> u64 {
        let mut counts = self.counts.lock().unwrap_or_else(|e| e.into_inner());
        let count = counts.entry(key.to_string()).or_insert(0);
        *count += 1;
        *count
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counts_per_key() {
        let store = InMemoryUsageStore::new();
        assert_eq!(store.get("alice"), 0);
        assert_eq!(store.increment("alice"), 1);
        assert_eq!(store.increment("alice"), 2);
        assert_eq!(store.increment("bob"), 1);
        assert_eq!(store.get("alice"), 2);
        assert_eq!(store.get("carol"), 0);
    }
}
