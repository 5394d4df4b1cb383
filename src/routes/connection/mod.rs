mod handler;
mod model;

pub use handler::{add_connection, list_connections, remove_connection, tap, today_count};
