//! `herald channels` - show registered channels and configuration state.

use console::style;

use herald_channels::Dispatcher;
use herald_core::config::HeraldConfig;

use crate::ui::output;

/// Run the channels command.
pub fn run(config: &HeraldConfig) {
    let dispatcher = Dispatcher::from_config(config);
    let available = dispatcher.available_channels();
    let configured = dispatcher.configured_channels();

    output::header("Channels");

    if available.is_empty() {
        output::info("No channels registered - add provider groups to the config file.");
        return;
    }

    for name in &available {
        let status = if configured.contains(name) {
            style("configured").green()
        } else {
            style("not configured").yellow()
        };
        println!("  {name}: {status}");
    }
}
