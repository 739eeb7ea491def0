use serde::{Deserialize, Serialize};
use std::time::Duration;

use railbook_core_types::MIN_QUERY_INTERVAL_MS;

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct FlowPolicy {
    pub poll: PollPolicy,
    pub confirm: ConfirmTimeouts,
    pub keywords: KeywordSets,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct PollPolicy {
    /// Floor applied to the configured query interval.
    pub min_interval_ms: u64,
    pub settle_timeout_ms: u64,
    pub settle_grain_ms: u64,
    /// Extra wait once loading looks finished but no rows are visible yet.
    pub settle_grace_ms: u64,
    pub max_attempts: u32,
    /// Delay after a selection before checking for an in-place navigation.
    pub navigation_grace_ms: u64,
}

impl PollPolicy {
    pub fn interval(&self, configured_ms: u64) -> Duration {
        Duration::from_millis(configured_ms.max(self.min_interval_ms).max(1))
    }

    pub fn settle_timeout(&self) -> Duration {
        Duration::from_millis(self.settle_timeout_ms)
    }

    pub fn settle_grain(&self) -> Duration {
        Duration::from_millis(self.settle_grain_ms)
    }

    pub fn settle_grace(&self) -> Duration {
        Duration::from_millis(self.settle_grace_ms)
    }

    pub fn navigation_grace(&self) -> Duration {
        Duration::from_millis(self.navigation_grace_ms)
    }
}

impl Default for PollPolicy {
    fn default() -> Self {
        Self {
            min_interval_ms: MIN_QUERY_INTERVAL_MS,
            settle_timeout_ms: 5_000,
            settle_grain_ms: 150,
            settle_grace_ms: 300,
            max_attempts: 20,
            navigation_grace_ms: 500,
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct ConfirmTimeouts {
    pub prep_initial_ms: u64,
    pub prep_step_ms: u64,
    pub passenger_settle_ms: u64,
    pub submit_timeout_ms: u64,
    pub submit_grain_ms: u64,
    pub dialog_timeout_ms: u64,
    pub dialog_grain_ms: u64,
    pub after_confirm_click_ms: u64,
}

impl ConfirmTimeouts {
    pub fn prep_initial(&self) -> Duration {
        Duration::from_millis(self.prep_initial_ms)
    }

    pub fn prep_step(&self) -> Duration {
        Duration::from_millis(self.prep_step_ms)
    }

    pub fn passenger_settle(&self) -> Duration {
        Duration::from_millis(self.passenger_settle_ms)
    }

    pub fn submit_timeout(&self) -> Duration {
        Duration::from_millis(self.submit_timeout_ms)
    }

    pub fn submit_grain(&self) -> Duration {
        Duration::from_millis(self.submit_grain_ms)
    }

    pub fn dialog_timeout(&self) -> Duration {
        Duration::from_millis(self.dialog_timeout_ms)
    }

    pub fn dialog_grain(&self) -> Duration {
        Duration::from_millis(self.dialog_grain_ms)
    }

    pub fn after_confirm_click(&self) -> Duration {
        Duration::from_millis(self.after_confirm_click_ms)
    }
}

impl Default for ConfirmTimeouts {
    fn default() -> Self {
        Self {
            prep_initial_ms: 150,
            prep_step_ms: 60,
            passenger_settle_ms: 30,
            submit_timeout_ms: 60_000,
            submit_grain_ms: 500,
            dialog_timeout_ms: 15_000,
            dialog_grain_ms: 50,
            after_confirm_click_ms: 1_000,
        }
    }
}

/// Phrases recognized in the confirmation page text.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct KeywordSets {
    pub no_seat: Vec<String>,
    pub transient_error: Vec<String>,
    pub payment: Vec<String>,
}

impl KeywordSets {
    pub fn no_seat_in<'a>(&'a self, text: &str) -> Option<&'a str> {
        find_in(&self.no_seat, text)
    }

    pub fn error_in<'a>(&'a self, text: &str) -> Option<&'a str> {
        find_in(&self.transient_error, text)
    }

    pub fn payment_in<'a>(&'a self, text: &str) -> Option<&'a str> {
        find_in(&self.payment, text)
    }
}

fn find_in<'a>(keywords: &'a [String], text: &str) -> Option<&'a str> {
    keywords
        .iter()
        .map(String::as_str)
        .find(|keyword| !keyword.is_empty() && text.contains(keyword))
}

impl Default for KeywordSets {
    fn default() -> Self {
        let owned = |words: &[&str]| words.iter().map(|w| w.to_string()).collect();
        Self {
            no_seat: owned(&["无票", "余票0", "余票不足", "无法满足", "车票不足"]),
            transient_error: owned(&["系统繁忙", "网络异常", "提交失败", "请重试", "验证码错误"]),
            payment: owned(&["支付", "订单号"]),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn interval_respects_floor() {
        let policy = PollPolicy::default();
        assert_eq!(policy.interval(100), Duration::from_millis(800));
        assert_eq!(policy.interval(1500), Duration::from_millis(1500));
    }

    #[test]
    fn keywords_match_substrings() {
        let keywords = KeywordSets::default();
        assert_eq!(keywords.no_seat_in("当前余票不足，请重新选择"), Some("余票不足"));
        assert_eq!(keywords.error_in("系统繁忙，请稍后"), Some("系统繁忙"));
        assert_eq!(keywords.payment_in("订单号：E123"), Some("订单号"));
        assert_eq!(keywords.payment_in("请核对信息"), None);
    }
}
