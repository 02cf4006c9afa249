//! Глобальный logger симуляции
//!
//! Pluggable printer (консоль по умолчанию, headless host может подменить),
//! минимальный уровень фильтрует сообщения ДО форматирования timestamp.

use std::sync::atomic::{AtomicU8, Ordering};

use once_cell::sync::Lazy;
use parking_lot::Mutex;

static LOGGER: Lazy<Mutex<Option<Box<dyn LogPrinter>>>> = Lazy::new(|| Mutex::new(None));

// Atomic: уровень читается из worker chunks на каждый debug вызов
static LOGGER_LEVEL: AtomicU8 = AtomicU8::new(LogLevel::Info as u8);

pub fn set_logger(logger: Box<dyn LogPrinter>) {
    *LOGGER.lock() = Some(logger);
}

pub fn set_log_level(level: LogLevel) {
    LOGGER_LEVEL.store(level as u8, Ordering::Relaxed);
}

pub fn log_level() -> LogLevel {
    LogLevel::from_u8(LOGGER_LEVEL.load(Ordering::Relaxed))
}

/// Пройдёт ли сообщение `level` фильтр. Горячие пути проверяют это до `format!`.
pub fn log_enabled(level: LogLevel) -> bool {
    level >= log_level()
}

pub fn set_logger_if_needed(logger: Box<dyn LogPrinter>) {
    let mut slot = LOGGER.lock();
    if slot.is_none() {
        *slot = Some(logger);
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum LogLevel {
    Debug,
    Info,
    Warning,
    Error,
}

impl LogLevel {
    fn from_u8(value: u8) -> Self {
        match value {
            0 => LogLevel::Debug,
            1 => LogLevel::Info,
            2 => LogLevel::Warning,
            _ => LogLevel::Error,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            LogLevel::Debug => "DEBUG",
            LogLevel::Info => "INFO",
            LogLevel::Warning => "WARNING",
            LogLevel::Error => "ERROR",
        }
    }
}

pub trait LogPrinter: Send + Sync {
    fn log(&self, level: LogLevel, message: &str);
}

pub fn log(message: &str) {
    log_with_level(LogLevel::Debug, message);
}

pub fn log_info(message: &str) {
    log_with_level(LogLevel::Info, message);
}

pub fn log_warning(message: &str) {
    log_with_level(LogLevel::Warning, message);
}

pub fn log_error(message: &str) {
    log_with_level(LogLevel::Error, message);
}

pub fn log_with_level(level: LogLevel, message: &str) {
    if !log_enabled(level) {
        return;
    }

    // timestamp добавляем здесь, printer получает готовую строку
    if let Some(logger) = LOGGER.lock().as_ref() {
        let timestamp = chrono::Local::now().format("%Y-%m-%d %H:%M:%S%.3f");
        logger.log(level, &format!("[{}] {}", timestamp, message));
    }
}

pub struct ConsoleLogger;

impl LogPrinter for ConsoleLogger {
    fn log(&self, level: LogLevel, message: &str) {
        match level {
            LogLevel::Warning | LogLevel::Error => eprintln!("[{}] {}", level.as_str(), message),
            _ => println!("[{}] {}", level.as_str(), message),
        }
    }
}

pub fn init_logger() {
    set_logger_if_needed(Box::new(ConsoleLogger));
}
