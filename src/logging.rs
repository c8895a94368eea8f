use env_logger::{Builder, Env, Target};
use std::error::Error;
use std::fs::{self, OpenOptions};
use std::path::Path;

/// Environment variable holding the log filter, e.g. `KEYSPRINT_LOG=debug`
pub const LOG_ENV: &str = "KEYSPRINT_LOG";

/// Send `log` output to a file; the terminal belongs to the UI.
pub fn init(path: &Path) -> Result<(), Box<dyn Error>> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let file = OpenOptions::new().create(true).append(true).open(path)?;

    Builder::from_env(Env::default().filter_or(LOG_ENV, "info"))
        .target(Target::Pipe(Box::new(file)))
        .format_timestamp_millis()
        .try_init()?;

    log::info!("logging to {}", path.display());
    Ok(())
}
