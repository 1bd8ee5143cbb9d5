//! Generic launcher: boots the built-in processes from a configuration file.
//!
//! The configuration template defaults to `config/app.{env}.toml` and can be
//! overridden with `BOOTVISOR_CONFIG`.

use std::process::ExitCode;

use bootvisor::App;

const DEFAULT_CONFIG: &str = "config/app.{env}.toml";

fn main() -> ExitCode {
    let template = std::env::var("BOOTVISOR_CONFIG").unwrap_or_else(|_| DEFAULT_CONFIG.to_string());
    App::new(template).run()
}
