use chrono::{Local, Timelike};
use std::sync::{Mutex, OnceLock};
use terminal_color_builder::OutputFormatter as tcb;

pub trait LogOutput: Send {
    fn log(&mut self, log: &str);
    fn success(&mut self, success: &str);
    fn error(&mut self, error: &str);
    fn warning(&mut self, warning: &str);
}

#[derive(Debug, Clone, Copy, Default)]
pub struct CoutLogger {}

impl LogOutput for CoutLogger {
    fn log(&mut self, log: &str) {
        let time = Local::now();
        println!(
            "[{:02}:{:02}:{:02}] {}",
            time.hour(),
            time.minute(),
            time.second(),
            log
        );
    }

    fn success(&mut self, success: &str) {
        let time = Local::now();
        println!(
            "[{:02}:{:02}:{:02}] {}",
            time.hour(),
            time.minute(),
            time.second(),
            tcb::new().fg().hex("00af00").text_str(success).print()
        );
    }

    fn error(&mut self, error: &str) {
        let time = Local::now();
        eprintln!(
            "[{:02}:{:02}:{:02}] {}",
            time.hour(),
            time.minute(),
            time.second(),
            tcb::new().fg().hex("d70000").text_str(error).print()
        );
    }

    fn warning(&mut self, warning: &str) {
        let time = Local::now();
        eprintln!(
            "[{:02}:{:02}:{:02}] {}",
            time.hour(),
            time.minute(),
            time.second(),
            tcb::new().fg().hex("d75f00").text_str(warning).print()
        );
    }
}

static LOGGER: OnceLock<Mutex<Box<dyn LogOutput>>> = OnceLock::new();

/// Installs the global log output. Only the first call has any effect.
pub fn set_logger<T: 'static + LogOutput>(output: T) {
    let _ = LOGGER.set(Mutex::new(Box::new(output)));
}

fn with_logger(f: impl FnOnce(&mut dyn LogOutput)) {
    if let Some(l) = LOGGER.get() {
        if let Ok(mut l) = l.lock() {
            f(l.as_mut());
        }
    }
}

pub fn log<T: AsRef<str>>(message: T) {
    with_logger(|l| l.log(message.as_ref()));
}

pub fn success<T: AsRef<str>>(message: T) {
    with_logger(|l| l.success(message.as_ref()));
}

pub fn error<T: AsRef<str>>(message: T) {
    with_logger(|l| l.error(message.as_ref()));
}

pub fn warning<T: AsRef<str>>(message: T) {
    with_logger(|l| l.warning(message.as_ref()));
}
