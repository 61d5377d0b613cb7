// Build-time version from Cargo.toml

/// Package version (from Cargo.toml).
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Package name (from Cargo.toml).
pub const NAME: &str = env!("CARGO_PKG_NAME");

/// User-Agent sent to the release feed and registries.
pub const USER_AGENT: &str = concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION"));

/// One-line description printed by the `version` subcommand and logged at startup.
pub fn info() -> String {
    format!(
        "{NAME}, version {VERSION} ({} {})",
        std::env::consts::OS,
        std::env::consts::ARCH
    )
}
