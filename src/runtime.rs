pub mod class_loader;
pub mod cp_utils;
mod dispatch;
pub mod exceptions;
pub mod method_area;
pub mod mirror;
pub mod mtable;
pub mod native;
pub mod statics;
mod structs;
pub mod verifier;

use log::{debug, warn};

use crate::{
    Result,
    config::{self, Config},
};
pub use class_loader::{
    load_class_from_bytes, load_class_from_name_only, normalize_class_reference, post_process,
};
pub use dispatch::{fetch_method_and_cp, link_class};
pub use structs::*;

/// Installs `config` and brings up the process-wide tables: the module map,
/// preloaded array classes and statics, and the native methods.
pub fn init(config: Config) -> Result<()> {
    config::install(config);
    let config = config::current();

    match config.java_home {
        Some(_) => {
            let map = class_loader::init_module_map(&config)?;
            debug!(
                "module map ready: {} classes, from snapshot: {}",
                map.len(),
                map.found_snapshot()
            );
            if config.preload_base_classes {
                match class_loader::load_base_classes(class_loader::BASE_MODULE) {
                    Ok(count) => debug!("preloaded {count} base classes"),
                    Err(e) => warn!("cannot preload base classes: {e}"),
                }
            }
        }
        None => warn!("JAVA_HOME is not set, JDK classes cannot be loaded"),
    }

    method_area::preload();
    statics::preload();
    let natives = native::load_natives();
    debug!("runtime initialised with {natives} native methods");
    Ok(())
}
