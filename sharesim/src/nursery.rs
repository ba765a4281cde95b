use std::{
    any::Any,
    cell::Ref,
    collections::{BTreeMap, btree_map::Keys},
    rc::Rc,
};

use log::debug;

use crate::{
    ProcessId, communication::SharesimMessage, global::set_process,
    process_handle::MutableProcessHandle,
};

pub(crate) type HandlerMap = BTreeMap<ProcessId, MutableProcessHandle>; // btree for deterministic iterators

pub(crate) struct Nursery {
    procs: HandlerMap,
}

impl Nursery {
    pub(crate) fn new(procs: HandlerMap) -> Rc<Self> {
        Rc::new(Self { procs })
    }

    pub(crate) fn start_single(&self, id: ProcessId) {
        let Some(handle) = self.procs.get(&id) else {
            return;
        };
        set_process(id);
        debug!("Starting P{id}");
        handle.borrow_mut().start();
    }

    pub(crate) fn deliver(&self, from: ProcessId, to: ProcessId, m: SharesimMessage) {
        let Some(handle) = self.procs.get(&to) else {
            debug!("Dropping event for unknown P{to}");
            return;
        };
        let mut handle = handle.borrow_mut();
        set_process(to);
        debug!("Executing step for From: P{from} | To: P{to}");
        match m {
            SharesimMessage::NetworkMessage(ptr) => handle.on_message(from, ptr),
            SharesimMessage::Timer(id) => handle.on_timer(id),
        }
    }

    pub(crate) fn keys(&self) -> Keys<'_, ProcessId, MutableProcessHandle> {
        self.procs.keys()
    }

    /// Borrows process `id` as its concrete type.
    pub(crate) fn process<P: Any>(&self, id: ProcessId) -> Option<Ref<'_, P>> {
        let handle = self.procs.get(&id)?.borrow();
        Ref::filter_map(handle, |h| (&**h as &dyn Any).downcast_ref::<P>()).ok()
    }
}
