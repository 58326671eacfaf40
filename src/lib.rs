#![warn(clippy::all, rust_2018_idioms)]
mod app;
pub mod backend;
pub mod error;
pub mod model;
pub mod playback;
pub mod projection;
pub mod scene;
pub mod session;
pub mod settings;
pub mod sync;
mod ui;
pub use app::DotBotsConsoleApp;
pub use error::ConsoleError;
pub const APP_NAME: &str = "DotBots Console";
pub(crate) use egui_phosphor::regular as icons;

/// Concatenate an icon const with a string literal at compile time (zero allocation).
/// Usage: `icon_str!(icons::GEAR_FINE, "Settings")` => `&'static str`
macro_rules! icon_str {
    ($icon:expr, $text:expr) => {
        const_format::concatcp!($icon, " ", $text)
    };
}
pub(crate) use icon_str;
