use std::sync::Arc;

use lodestar_container::Wire;

#[derive(Default, Wire)]
struct Pair(#[wire("left")] Option<Arc<u8>>, #[wire] Arc<u16>, u32);

#[derive(Wire)]
struct Empty;

fn assert_wire<T: lodestar_container::wire::Wire>() {}

fn main() {
    assert_wire::<Pair>();
    assert_wire::<Empty>();
}
