use crate::{MessagePtr, TimerId};

pub(crate) enum SharesimMessage {
    NetworkMessage(MessagePtr),
    Timer(TimerId),
}
