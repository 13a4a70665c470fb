use std::sync::Arc;

use lodestar_container::prelude::*;

trait Clock: Send + Sync {}

#[derive(Default, Wire)]
#[wire(after_wire)]
struct Service {
    #[wire("count")]
    count: Option<Arc<u32>>,
    #[wire(name = "label", transient)]
    label: Option<Arc<String>>,
    #[wire(",transient")]
    clock: Option<Arc<dyn Clock>>,
    #[wire(optional)]
    fallback: Option<Arc<u64>>,
    untouched: bool,
}

impl AfterWire for Service {
    fn after_wire(&mut self) -> Result<Option<Cleanup>, BoxError> {
        self.untouched = true;
        Ok(None)
    }
}

fn assert_wire<T: Wire>() {}

fn main() {
    assert_wire::<Service>();
    let service = Service::default();
    let _ = (service.count, service.label, service.clock, service.fallback);
}
