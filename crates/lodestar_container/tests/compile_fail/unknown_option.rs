use lodestar_container::prelude::*;

#[derive(Wire)]
pub struct Service {
    #[wire(eager)]
    pub limit: Option<u32>,
}

fn main() {}
