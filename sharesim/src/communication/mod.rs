mod destination;
mod message;
mod sharesim_message;

pub use destination::Destination;
pub use message::Message;
pub use message::MessagePtr;
pub(crate) use message::{ProcessStep, RoutedMessage, TimePriorityMessageQueue};
pub(crate) use sharesim_message::SharesimMessage;
