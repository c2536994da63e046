//! Logging fan-out: every log record goes to whichever handlers are
//! installed (a ring buffer for the in-app log pane, stderr, and an
//! optional TCP broadcaster for remote `tail -f`-style viewing). A
//! failure in one handler (a dropped socket, a closed pipe) never stops
//! the others from receiving the record.

use std::collections::HashMap;
use std::io::Write;
use std::net::{TcpListener, TcpStream};
use std::sync::{Arc, Mutex};

use serde::Serialize;

pub const DEFAULT_RING_BUFFER_CAPACITY: usize = 1000;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
pub enum Level {
    #[serde(rename = "DEBUG")]
    Debug,
    #[serde(rename = "INFO")]
    Info,
    #[serde(rename = "WARNING")]
    Warn,
    #[serde(rename = "ERROR")]
    Error,
    #[serde(rename = "CRITICAL")]
    Critical,
}

/// One log record. Field names follow the remote-log wire format exactly
/// (`timestamp`, `source`, `level`, `message`) rather than the more
/// descriptive internal names, since this struct is serialized directly
/// onto the wire by [`RemoteHandler`].
#[derive(Debug, Clone, Serialize)]
pub struct LogRecord {
    #[serde(rename = "timestamp")]
    pub timestamp_secs: u64,
    #[serde(rename = "source")]
    pub logger: String,
    pub level: Level,
    pub message: String,
}

pub trait LogHandler: Send {
    fn handle(&mut self, record: &LogRecord);
}

/// Fixed-capacity ring buffer backing the in-app log pane. Oldest records
/// fall off once `capacity` is reached.
pub struct LogPaneHandler {
    capacity: usize,
    records: std::collections::VecDeque<LogRecord>,
}

impl LogPaneHandler {
    pub fn new(capacity: usize) -> Self {
        Self { capacity, records: std::collections::VecDeque::with_capacity(capacity) }
    }

    pub fn records(&self) -> impl Iterator<Item = &LogRecord> {
        self.records.iter()
    }
}

impl Default for LogPaneHandler {
    fn default() -> Self {
        Self::new(DEFAULT_RING_BUFFER_CAPACITY)
    }
}

impl LogHandler for LogPaneHandler {
    fn handle(&mut self, record: &LogRecord) {
        if self.records.len() >= self.capacity {
            self.records.pop_front();
        }
        self.records.push_back(record.clone());
    }
}

/// Shared handle to a [`LogPaneHandler`]'s ring buffer, held by both the
/// [`LogManager`] (through [`LogPaneForwarder`]) and the file manager
/// layer that renders the log pane, so the UI can read records straight
/// out of the buffer without going through the [`LogHandler`] trait.
pub type SharedLogPane = Arc<Mutex<LogPaneHandler>>;

/// Installs a [`SharedLogPane`] as a regular [`LogHandler`] by
/// forwarding every record into it.
pub struct LogPaneForwarder(SharedLogPane);

impl LogPaneForwarder {
    /// Builds a fresh ring buffer plus the handler that feeds it,
    /// returning both -- the handler goes to [`LogManager::add_handler`]
    /// and the shared handle goes to whatever renders the log pane.
    pub fn new(capacity: usize) -> (Self, SharedLogPane) {
        let shared = Arc::new(Mutex::new(LogPaneHandler::new(capacity)));
        (Self(shared.clone()), shared)
    }
}

impl LogHandler for LogPaneForwarder {
    fn handle(&mut self, record: &LogRecord) {
        self.0.lock().unwrap().handle(record);
    }
}

/// Writes `"[LEVEL] logger: message"` lines to an arbitrary `Write` sink
/// (normally stderr).
pub struct StreamHandler<W: Write + Send> {
    sink: W,
}

impl<W: Write + Send> StreamHandler<W> {
    pub fn new(sink: W) -> Self {
        Self { sink }
    }
}

impl<W: Write + Send> LogHandler for StreamHandler<W> {
    fn handle(&mut self, record: &LogRecord) {
        let _ = writeln!(
            self.sink,
            "[{:?}] {}: {}",
            record.level, record.logger, record.message
        );
    }
}

/// Broadcasts every record as a newline-delimited JSON object to every
/// connected TCP client on loopback. Meant for `nc localhost <port>` or a
/// companion log-tailing tool, never exposed beyond localhost.
pub struct RemoteHandler {
    clients: Arc<Mutex<Vec<TcpStream>>>,
    port: u16,
}

impl RemoteHandler {
    pub fn bind(port: u16) -> std::io::Result<Self> {
        let listener = TcpListener::bind(("127.0.0.1", port))?;
        let actual_port = listener.local_addr()?.port();
        let clients = Arc::new(Mutex::new(Vec::new()));
        let accept_clients = clients.clone();

        std::thread::spawn(move || {
            for stream in listener.incoming().flatten() {
                accept_clients.lock().unwrap().push(stream);
            }
        });

        Ok(Self { clients, port: actual_port })
    }

    pub fn port(&self) -> u16 {
        self.port
    }
}

impl LogHandler for RemoteHandler {
    fn handle(&mut self, record: &LogRecord) {
        let Ok(mut line) = serde_json::to_string(record) else { return };
        line.push('\n');
        let mut clients = self.clients.lock().unwrap();
        clients.retain_mut(|client| client.write_all(line.as_bytes()).is_ok());
    }
}

/// Per-logger-name level filter plus the installed handler fan-out.
pub struct LogManager {
    default_level: Level,
    logger_levels: Mutex<HashMap<String, Level>>,
    handlers: Mutex<Vec<Box<dyn LogHandler>>>,
}

impl LogManager {
    pub fn new(default_level: Level) -> Self {
        Self {
            default_level,
            logger_levels: Mutex::new(HashMap::new()),
            handlers: Mutex::new(Vec::new()),
        }
    }

    pub fn add_handler(&self, handler: Box<dyn LogHandler>) {
        self.handlers.lock().unwrap().push(handler);
    }

    pub fn set_logger_level(&self, logger: impl Into<String>, level: Level) {
        self.logger_levels.lock().unwrap().insert(logger.into(), level);
    }

    fn effective_level(&self, logger: &str) -> Level {
        self.logger_levels
            .lock()
            .unwrap()
            .get(logger)
            .copied()
            .unwrap_or(self.default_level)
    }

    pub fn log(&self, logger: &str, level: Level, message: impl Into<String>) {
        if level < self.effective_level(logger) {
            return;
        }
        let record = LogRecord {
            logger: logger.to_string(),
            level,
            message: message.into(),
            timestamp_secs: std::time::SystemTime::now()
                .duration_since(std::time::UNIX_EPOCH)
                .map(|d| d.as_secs())
                .unwrap_or(0),
        };
        for handler in self.handlers.lock().unwrap().iter_mut() {
            handler.handle(&record);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ring_buffer_drops_oldest_past_capacity() {
        let mut pane = LogPaneHandler::new(2);
        for i in 0..3 {
            pane.handle(&LogRecord {
                logger: "test".into(),
                level: Level::Info,
                message: format!("msg{i}"),
                timestamp_secs: 0,
            });
        }
        let messages: Vec<_> = pane.records().map(|r| r.message.clone()).collect();
        assert_eq!(messages, vec!["msg1", "msg2"]);
    }

    #[test]
    fn per_logger_level_overrides_default() {
        let manager = LogManager::new(Level::Warn);
        manager.set_logger_level("verbose", Level::Debug);

        let pane = Box::new(LogPaneHandler::new(10));
        let pane_ref = Arc::new(Mutex::new(pane));
        struct Forwarding(Arc<Mutex<Box<LogPaneHandler>>>);
        impl LogHandler for Forwarding {
            fn handle(&mut self, record: &LogRecord) {
                self.0.lock().unwrap().handle(record);
            }
        }
        manager.add_handler(Box::new(Forwarding(pane_ref.clone())));

        manager.log("quiet", Level::Info, "should be filtered");
        manager.log("verbose", Level::Debug, "should pass");

        let recorded: Vec<_> = pane_ref.lock().unwrap().records().map(|r| r.message.clone()).collect();
        assert_eq!(recorded, vec!["should pass"]);
    }

    #[test]
    fn remote_handler_binds_to_loopback_and_reports_its_port() {
        let handler = RemoteHandler::bind(0).unwrap();
        assert!(handler.port() > 0);
    }

    #[test]
    fn wire_format_uses_timestamp_source_level_message() {
        let record = LogRecord {
            timestamp_secs: 42,
            logger: "startup".to_string(),
            level: Level::Critical,
            message: "disk full".to_string(),
        };
        let json = serde_json::to_string(&record).unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["timestamp"], 42);
        assert_eq!(value["source"], "startup");
        assert_eq!(value["level"], "CRITICAL");
        assert_eq!(value["message"], "disk full");
    }

    #[test]
    fn level_labels_match_the_spec_vocabulary() {
        assert_eq!(serde_json::to_string(&Level::Debug).unwrap(), "\"DEBUG\"");
        assert_eq!(serde_json::to_string(&Level::Info).unwrap(), "\"INFO\"");
        assert_eq!(serde_json::to_string(&Level::Warn).unwrap(), "\"WARNING\"");
        assert_eq!(serde_json::to_string(&Level::Error).unwrap(), "\"ERROR\"");
        assert_eq!(serde_json::to_string(&Level::Critical).unwrap(), "\"CRITICAL\"");
    }
}
