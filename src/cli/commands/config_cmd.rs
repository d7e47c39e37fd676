//! Configuration display command.

use crate::config::Settings;

/// Print the effective configuration as TOML with secrets masked.
pub fn cmd_config(settings: &Settings) -> anyhow::Result<()> {
    print!("{}", settings.redacted().to_toml()?);
    Ok(())
}
