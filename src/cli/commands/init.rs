//! `init` and `config` commands.

use std::io::Write;
use std::path::Path;

use anyhow::anyhow;

use crate::config::Settings;

/// Write a default `.livequery/settings.toml` under the current directory.
///
/// Refuses to overwrite an existing file unless `force` is set.
pub fn run_init(force: bool, out: &mut dyn Write) -> anyhow::Result<()> {
    let path = Settings::init_config_file(force).map_err(|e| anyhow!("{e}"))?;
    writeln!(out, "Created configuration file at: {}", path.display())?;
    writeln!(out, "Edit this file to customize your settings.")?;
    Ok(())
}

/// Print the effective settings as TOML.
///
/// `source` is the file passed with `--config`, if any.
pub fn run_config(
    settings: &Settings,
    source: Option<&Path>,
    out: &mut dyn Write,
) -> anyhow::Result<()> {
    match source {
        Some(path) => writeln!(out, "# settings from {} (+ LQ_ overrides)", path.display())?,
        None => writeln!(out, "# effective settings (defaults, workspace file, LQ_ overrides)")?,
    }
    write!(out, "{}", settings.to_toml()?)?;
    Ok(())
}
