use lodestar_container::prelude::*;

#[derive(Wire)]
pub struct Service {
    #[wire(optional)]
    pub limit: u32,
}

fn main() {}
