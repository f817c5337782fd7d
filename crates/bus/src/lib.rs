pub mod error;
pub mod message;
pub mod pubsub;
pub mod topics;
pub mod traits;
pub mod transport;

pub use error::BusError;
pub use message::Message;
pub use pubsub::{ZmqPublisher, ZmqSubscriber};
pub use traits::{EventPublisher, EventSubscriber};
pub use transport::Transport;
