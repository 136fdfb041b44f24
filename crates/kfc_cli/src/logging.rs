use std::sync::Once;
use tracing::Level;

static INIT: Once = Once::new();

pub fn init_logging(show_debug_info: bool) {
    if tracing::dispatcher::has_been_set() {
        return;
    }
    let level = if show_debug_info { Level::DEBUG } else { Level::INFO };
    INIT.call_once(|| {
        tracing_subscriber::fmt()
            .with_max_level(level)
            .with_target(false)
            .init();
    });
}
