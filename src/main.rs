#![warn(clippy::all, rust_2018_idioms)]
#![cfg_attr(not(debug_assertions), windows_subsystem = "windows")] // hide console window on Windows in release

fn main() -> eframe::Result<()> {
    #[cfg(feature = "logging")]
    let _log_guard = {
        // Janky hack to address https://github.com/tokio-rs/tracing/issues/1817
        struct NewType(Pretty);

        impl<'writer> FormatFields<'writer> for NewType {
            fn format_fields<R: RecordFields>(&self, writer: Writer<'writer>, fields: R) -> core::fmt::Result {
                self.0.format_fields(writer, fields)
            }
        }

        use tracing_appender::rolling::Rotation;
        use tracing_subscriber::EnvFilter;
        use tracing_subscriber::Layer;
        use tracing_subscriber::field::RecordFields;
        use tracing_subscriber::fmt;
        use tracing_subscriber::fmt::FormatFields;
        use tracing_subscriber::fmt::format::Pretty;
        use tracing_subscriber::fmt::format::Writer;
        use tracing_subscriber::fmt::time::LocalTime;
        use tracing_subscriber::layer::SubscriberExt;

        let env_filter = || EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info,dotbots_console=debug"));

        let file_appender = tracing_appender::rolling::Builder::new()
            .rotation(Rotation::HOURLY)
            .max_log_files(1)
            .filename_prefix("dotbots_console.log")
            .build(".")
            .expect("failed to build file appender");
        let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);
        let subscriber = tracing_subscriber::registry()
            .with(
                fmt::Layer::new()
                    .pretty()
                    .fmt_fields(NewType(Pretty::default()))
                    .with_ansi(true)
                    .with_filter(env_filter()),
            )
            .with(
                fmt::Layer::new()
                    .with_writer(non_blocking)
                    .with_timer(LocalTime::rfc_3339())
                    .with_ansi(false)
                    .with_filter(env_filter()),
            );
        tracing::subscriber::set_global_default(subscriber).expect("setting default subscriber failed");
        guard
    };

    let native_options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_inner_size([1040.0, 720.0])
            .with_min_inner_size([480.0, 320.0])
            .with_title(format!("{} v{}", dotbots_console::APP_NAME, env!("CARGO_PKG_VERSION"))),
        ..Default::default()
    };

    eframe::run_native(
        dotbots_console::APP_NAME,
        native_options,
        Box::new(|cc| Ok(Box::new(dotbots_console::DotBotsConsoleApp::new(cc)))),
    )
}
