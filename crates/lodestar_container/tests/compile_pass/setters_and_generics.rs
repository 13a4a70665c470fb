use std::sync::Arc;

use lodestar_container::prelude::*;

trait Plugin: Send + Sync {}

#[derive(Default, Wire)]
struct Host<T: Send + Sync + 'static> {
    #[wire(setter)]
    value: Option<Arc<T>>,
    #[wire(setter = "install_plugins")]
    plugins: Option<NamedCollection<dyn Plugin>>,
    installed: usize,
}

impl<T: Send + Sync + 'static> Host<T> {
    fn set_value(&mut self, value: Arc<T>) {
        self.value = Some(value);
    }

    fn install_plugins(&mut self, plugins: NamedCollection<dyn Plugin>) {
        self.installed = plugins.len();
    }
}

fn main() {
    let container = Container::new();
    let mut host = Host::<u32>::default();
    let _ = container.dry_run(&mut host);
    let _ = (host.plugins, host.installed);
}
