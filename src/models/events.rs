use super::websocket::PushEvent;

/// What the connection manager announces to its observer.
#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    Connected,
    Disconnected,
    Push(PushEvent),
}
