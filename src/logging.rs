// `log` backend writing to the browser console.

use wasm_bindgen::prelude::*;

#[wasm_bindgen]
extern "C" {
    #[wasm_bindgen(js_namespace = console, js_name = log)]
    fn console_log(msg: &str, format: &str);
    #[wasm_bindgen(js_namespace = console, js_name = info)]
    fn console_info(msg: &str, format: &str);
    #[wasm_bindgen(js_namespace = console, js_name = warn)]
    fn console_warn(msg: &str, format: &str);
    #[wasm_bindgen(js_namespace = console, js_name = error)]
    fn console_error(msg: &str, format: &str);
}

static LOGGER: ConsoleLog = ConsoleLog;

#[derive(Default)]
pub struct ConsoleLog;

/// Level tag and CSS color for the `%c` prefix.
fn level_style(level: log::Level) -> (&'static str, &'static str) {
    match level {
        log::Level::Trace => ("trace", "color:plum"),
        log::Level::Debug => ("debug", "color:cyan"),
        log::Level::Info => ("info", "color:mediumseagreen"),
        log::Level::Warn => ("warn", "color:goldenrod"),
        log::Level::Error => ("error", "color:red"),
    }
}

impl log::Log for ConsoleLog {
    fn enabled(&self, metadata: &log::Metadata) -> bool {
        metadata.level() <= log::max_level()
    }

    fn log(&self, record: &log::Record) {
        if !self.enabled(record.metadata()) {
            return;
        }

        let write: fn(&str, &str) = match record.level() {
            log::Level::Trace | log::Level::Debug => console_log,
            log::Level::Info => console_info,
            log::Level::Warn => console_warn,
            log::Level::Error => console_error,
        };
        let (name, color) = level_style(record.level());
        write(&format!("%c{}\t[tour] {}", name, record.args()), color);
    }

    fn flush(&self) {}
}

/// Install the console logger. Later calls keep the first logger.
pub fn install(level: log::LevelFilter) {
    if log::set_logger(&LOGGER).is_ok() {
        log::set_max_level(level);
    }
}
