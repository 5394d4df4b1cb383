/// 缓存键构造

const SUMMARY_DATA_PREFIX: &str = "summary:data:";
const SUMMARY_TIME_PREFIX: &str = "summary:time:";
const PREFERENCES_PREFIX: &str = "prefs:";
const RATE_LIMIT_PREFIX: &str = "rate_limit:";

/// 序列化的点按计数 (`summaryData`)
pub fn summary_data_key(uid: &str) -> String {
    format!("{}{}", SUMMARY_DATA_PREFIX, uid)
}

/// 上次计算时间，RFC 3339 格式 (`summaryTime`)
pub fn summary_time_key(uid: &str) -> String {
    format!("{}{}", SUMMARY_TIME_PREFIX, uid)
}

pub fn preferences_key(uid: &str) -> String {
    format!("{}{}", PREFERENCES_PREFIX, uid)
}

pub fn rate_limit_key(client: &str) -> String {
    format!("{}{}", RATE_LIMIT_PREFIX, client)
}
