use log::*;

pub use log::LevelFilter::*;

#[cfg(target_arch = "wasm32")]
struct JsLog;

#[cfg(target_arch = "wasm32")]
impl log::Log for JsLog {
    fn enabled(&self, _: &log::Metadata<'_>) -> bool {
        true
    }

    fn log(&self, record: &log::Record<'_>) {
        let message = format!("{}", record.args());

        web_sys::console::log_1(&message.into());
    }

    fn flush(&self) {}
}

#[cfg(target_arch = "wasm32")]
struct JsWarn;

#[cfg(target_arch = "wasm32")]
impl log::Log for JsWarn {
    fn enabled(&self, _: &log::Metadata<'_>) -> bool {
        true
    }

    fn log(&self, record: &log::Record<'_>) {
        let message = format!("{}", record.args());

        web_sys::console::warn_1(&message.into());
    }

    fn flush(&self) {}
}

fn sink() -> fern::Output {
    #[cfg(target_arch = "wasm32")]
    {
        fern::Output::from(Box::new(JsLog) as Box<dyn log::Log>)
    }

    #[cfg(not(target_arch = "wasm32"))]
    {
        fern::Output::from(std::io::stdout())
    }
}

fn warn_sink() -> fern::Output {
    #[cfg(target_arch = "wasm32")]
    {
        fern::Output::from(Box::new(JsWarn) as Box<dyn log::Log>)
    }

    #[cfg(not(target_arch = "wasm32"))]
    {
        fern::Output::from(std::io::stderr())
    }
}

pub fn setup_logging(verbosity: log::LevelFilter) {
    let result = fern::Dispatch::new()
        .level(verbosity)
        .format(|out, message, record| out.finish(format_args!("({}) {}: {}", record.level(), record.target(), message)))
        .chain(
            fern::Dispatch::new()
                .filter(|metadata| metadata.level() > log::Level::Warn)
                .chain(sink()),
        )
        .chain(
            fern::Dispatch::new()
                .level(log::LevelFilter::Warn)
                .chain(warn_sink()),
        )
        .apply();

    if result.is_err() {
        warn!("Logging already initialized, keeping existing dispatch");
    }
}

pub fn parse_level(level: &str) -> log::LevelFilter {
    level.parse().unwrap_or(log::LevelFilter::Info)
}
