use clap::{Parser, ValueEnum};
use menu_harvest::KeyScope;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "menu-harvest")]
#[command(about = "Harvests menu item details from a store page by clicking through it")]
#[command(version)]
pub struct Args {
    /// Store page URL (overrides the one in --config)
    pub store_url: Option<String>,

    /// JSON configuration file
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Where to write the harvested items and run report
    #[arg(short, long, default_value = "menu_items.json")]
    pub output: PathBuf,

    /// Attempts per menu item
    #[arg(short = 'a', long)]
    pub max_attempts: Option<u32>,

    /// Milliseconds to wait for an item's response after clicking it
    #[arg(short, long)]
    pub wait_window: Option<u64>,

    /// Total timeout in seconds (maximum runtime)
    #[arg(long)]
    pub total_timeout: Option<u64>,

    /// Stable key scope: per section, or once per page
    #[arg(long, value_enum)]
    pub key_scope: Option<KeyScopeArg>,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
pub enum KeyScopeArg {
    Segment,
    Page,
}

/// Convert from CLI argument key scope to the library's
pub fn convert_key_scope(arg: KeyScopeArg) -> KeyScope {
    match arg {
        KeyScopeArg::Segment => KeyScope::Segment,
        KeyScopeArg::Page => KeyScope::Page,
    }
}
