use lodestar_container::prelude::*;

#[derive(Wire)]
pub union Bits {
    int: u32,
    float: f32,
}

fn main() {}
