use crate::ProcessId;

pub enum Destination {
    // Every topology neighbour of the sender, optionally skipping one of them
    Neighbours { except: Option<ProcessId> },
    To(ProcessId),
}
