pub mod api;
pub mod app;
pub mod config;
pub mod connection;
pub mod error;
pub mod models;
pub mod normalize;
pub mod store;
pub mod token;
pub mod websocket;

pub use app::AppState;
pub use config::{Config, ReconnectConfig};
pub use connection::ConnectionStatus;
pub use error::{ClientError, Result};
pub use models::events::Event;
pub use models::poll::{OptionId, Poll, PollId, PollOption};
pub use models::websocket::PushEvent;
pub use store::PollsState;
pub use websocket::{run_websocket, WsHandle};
