use log::Level;
use serde_json::Value;

/// Emit a coded diagnostic event through the `log` facade.
///
/// Events carry a short code ("AI-0201"), a module tag used as the log
/// target, and optional structured data so a subscriber can filter the
/// runtime feed without parsing free text.
pub fn log_event(level: Level, code: &str, module: &str, message: &str, data: Option<Value>) {
    match data {
        Some(data) => log::log!(target: module, level, "[{code}] {message} {data}"),
        None => log::log!(target: module, level, "[{code}] {message}"),
    }
}
