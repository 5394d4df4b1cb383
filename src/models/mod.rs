mod connection;
mod summary;
mod tap;
pub mod user;

pub use connection::{Connection, NewConnection};
pub use summary::{SummaryCounts, TapTally};
pub use tap::Tap;
pub use user::{NewUser, Preferences, User, UserRef};
