mod handler;
mod model;

pub use handler::{
    get_preferences, login, logout, me, register, update_display_name, update_preferences,
};
