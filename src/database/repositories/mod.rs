// 基于 Postgres 的仓储

mod connection;
mod tap;
mod user;

pub use connection::PgConnectionRepository;
pub use tap::PgTapRepository;
pub use user::PgUserRepository;

pub(crate) fn is_unique_violation(err: &sqlx::Error) -> bool {
    err.as_database_error()
        .is_some_and(|db| db.is_unique_violation())
}
