//! Configuration commands.

use anyhow::Result;
use folio_core::config::{Config, Theme, paths};

pub fn path() -> Result<()> {
    println!("{}", paths::config_path().display());
    Ok(())
}

pub fn init() -> Result<()> {
    let path = paths::config_path();
    Config::init(&path)?;
    println!("Created config at {}", path.display());
    Ok(())
}

pub fn generate() -> Result<()> {
    print!("{}", Config::generate()?);
    Ok(())
}

pub fn theme(value: &str) -> Result<()> {
    let theme = match value {
        "dark" => Theme::Dark,
        "light" => Theme::Light,
        other => anyhow::bail!("unknown theme '{other}' (expected dark or light)"),
    };
    Config::save_theme(theme)?;
    println!("Theme set to {}", theme.display_name());
    Ok(())
}
