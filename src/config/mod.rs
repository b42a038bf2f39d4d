//! Unified configuration system.
//!
//! Consolidates configuration from tiers with field-by-field YAML merging:
//! 1. **Defaults** - Embedded in the binary
//! 2. **Project** - `$CWD/taskdeck/config.yaml`
//! 3. **User** - `~/.taskdeck/config.yaml`
//! 4. **Environment** - variables below
//!
//! Command-line flags are applied on top by the binary.
//!
//! ## Environment Variables
//! - `TASKDECK_CONFIG_PATH` - Explicit config file (replaces project and user tiers)
//! - `TASKDECK_DB_PATH` - Database path
//! - `TASKDECK_HOST` - Bind host
//! - `TASKDECK_PORT` - Bind port
//! - `TASKDECK_USER_DIR` - User config dir (default: `~/.taskdeck`)
//! - `TASKDECK_PROJECT_DIR` - Project config dir (default: `./taskdeck`)

mod loader;
mod merge;
mod types;

pub use loader::{ConfigLoader, ConfigPaths, ConfigTier};
pub use merge::deep_merge;
pub use types::*;
