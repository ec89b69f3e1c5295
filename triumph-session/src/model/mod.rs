mod deposit;
mod game_state;
mod host_config;
mod live_message;
mod lockdown;
mod mission;
mod other_games;
mod tournament;
mod user;

pub use deposit::*;
pub use game_state::*;
pub use host_config::*;
pub use live_message::*;
pub use lockdown::*;
pub use mission::*;
pub use other_games::*;
pub use tournament::*;
pub use user::*;
