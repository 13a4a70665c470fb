use lodestar_container::prelude::*;

#[derive(Wire)]
pub enum Mode {
    Live,
}

fn main() {}
