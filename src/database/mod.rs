// 文档存储访问：仓储 trait、Postgres 与内存实现

pub mod memory;
pub mod repositories;
pub mod traits;

pub use memory::MemoryStore;
pub use repositories::{PgConnectionRepository, PgTapRepository, PgUserRepository};
pub use traits::{
    ConnectionRepository, PreferenceRepository, SummaryCacheRepository, TapRepository,
    UserRepository,
};
