#![forbid(unsafe_code)]

pub mod error;
pub mod model;
pub mod reducer;
pub mod state;
pub mod time;

pub use error::Error;
pub use reducer::{AppAction, reduce};
pub use state::AppState;
pub use time::Clock;
