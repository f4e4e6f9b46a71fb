//! 单一维度的比较策略

use crate::model::{LocalAttributes, PathAttributes};
use chrono::{DateTime, FixedOffset, Offset, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// 比较结果
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Comparison {
    /// 两边都存在且一致
    Equal,
    /// 两边都存在但不一致
    NotEqual,
    /// 只有本地存在
    Local,
    /// 只有远程存在
    Remote,
}

impl fmt::Display for Comparison {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Comparison::Equal => write!(f, "equal"),
            Comparison::NotEqual => write!(f, "notequal"),
            Comparison::Local => write!(f, "local"),
            Comparison::Remote => write!(f, "remote"),
        }
    }
}

/// 比较策略，只返回 `Equal` 或 `NotEqual`
pub trait ComparisonService: Send + Sync {
    fn compare(&self, remote: &PathAttributes, local: &LocalAttributes) -> Comparison;
}

/// 校验和比较；任意一边为空时返回 `NotEqual`，表示无法判断
#[derive(Debug, Clone, Copy, Default)]
pub struct ChecksumComparisonService;

impl ComparisonService for ChecksumComparisonService {
    fn compare(&self, remote: &PathAttributes, local: &LocalAttributes) -> Comparison {
        if remote.checksum.matches(&local.checksum) {
            Comparison::Equal
        } else {
            Comparison::NotEqual
        }
    }
}

/// 大小比较；任意一边未知时返回 `NotEqual`
#[derive(Debug, Clone, Copy, Default)]
pub struct SizeComparisonService;

impl ComparisonService for SizeComparisonService {
    fn compare(&self, remote: &PathAttributes, local: &LocalAttributes) -> Comparison {
        match (remote.size, local.size) {
            (Some(r), Some(l)) if r == l => Comparison::Equal,
            _ => Comparison::NotEqual,
        }
    }
}

/// 修改时间比较
///
/// 两边时间都换算到指定时区并截断到秒，差值在容差内视为相同。
/// `FixedOffset` 的偏移量是整秒，两边又使用同一时区，所以换算不会改变比较结果；
/// 时区只决定截断发生在哪个本地时刻上。
#[derive(Debug, Clone, Copy)]
pub struct TimestampComparisonService {
    zone: FixedOffset,
    tolerance_seconds: i64,
}

impl TimestampComparisonService {
    pub fn new(zone: FixedOffset) -> Self {
        Self {
            zone,
            tolerance_seconds: 0,
        }
    }

    pub fn with_tolerance(mut self, seconds: i64) -> Self {
        self.tolerance_seconds = seconds.abs();
        self
    }

    fn seconds_in_zone(&self, millis: i64) -> Option<i64> {
        DateTime::from_timestamp_millis(millis).map(|t| t.with_timezone(&self.zone).timestamp())
    }
}

impl Default for TimestampComparisonService {
    fn default() -> Self {
        Self::new(Utc.fix())
    }
}

impl ComparisonService for TimestampComparisonService {
    fn compare(&self, remote: &PathAttributes, local: &LocalAttributes) -> Comparison {
        let remote_secs = remote
            .modification_date
            .and_then(|t| self.seconds_in_zone(t));
        let local_secs = local.modification_date.and_then(|t| self.seconds_in_zone(t));

        match (remote_secs, local_secs) {
            (Some(r), Some(l)) if (r - l).abs() <= self.tolerance_seconds => Comparison::Equal,
            _ => Comparison::NotEqual,
        }
    }
}
