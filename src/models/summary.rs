use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// 发送者用户名 → 窗口内收到的点按数
pub type TapTally = BTreeMap<String, u64>;

/// 最近 24 小时和最近 7 天收到的点按
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SummaryCounts {
    pub count24: TapTally,
    pub count7d: TapTally,
}

