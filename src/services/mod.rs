// 路由处理函数使用的业务服务

pub mod connections;
pub mod identity;
pub mod summary;
pub mod taps;

pub use connections::{ConnectionStore, RemovalOutcome};
pub use identity::{IdentityProvider, Registration, SignedIn};
pub use summary::{SummaryAggregator, SummaryState, SummaryView};
pub use taps::{TapOutcome, TapRecorder};
