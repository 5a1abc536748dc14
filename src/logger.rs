use log::Level;

/// Sink for the connection layer's diagnostics, injected into each component
pub trait Logger: Send + Sync {
    fn log(&self, level: Level, message: &str);

    fn debug(&self, message: &str) {
        self.log(Level::Debug, message);
    }

    fn info(&self, message: &str) {
        self.log(Level::Info, message);
    }

    fn warn(&self, message: &str) {
        self.log(Level::Warn, message);
    }

    fn error(&self, message: &str) {
        self.log(Level::Error, message);
    }
}

/// Forwards to the `log` facade, so whichever backend the process installed picks it up
#[derive(Debug, Default, Clone, Copy)]
pub struct LogFacade;

impl Logger for LogFacade {
    fn log(&self, level: Level, message: &str) {
        log::log!(target: "ble_led_panel", level, "{}", message);
    }
}

#[cfg(test)]
pub(crate) use recording::RecordingLogger;


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn provided_methods_pick_levels() {
        let logger = RecordingLogger::default();
        logger.debug("d");
        logger.info("i");
        logger.warn("w");
        logger.error("e");
        assert_eq!(
            logger.records(),
            vec![
                (Level::Debug, "d".to_string()),
                (Level::Info, "i".to_string()),
                (Level::Warn, "w".to_string()),
                (Level::Error, "e".to_string()),
            ]
        );
    }
}
