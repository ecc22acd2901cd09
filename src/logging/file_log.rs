use std::{fs::File, io::Write, path::Path, sync::Mutex};

use log::{Log, Record};

use osutils::files;

use super::LogEntry;

/// Logger appending JSON log entries to a file. Failing to create the file
/// disables the logger instead of failing the run.
pub struct FileLogger {
    target: Option<Mutex<File>>,
}

impl FileLogger {
    pub fn new(target: impl AsRef<Path>) -> Self {
        let file = match files::create_file(target.as_ref()) {
            Ok(f) => Some(Mutex::new(f)),
            Err(err) => {
                eprintln!("Logging setup error: failed to create log file: {:?}", err);
                None
            }
        };

        Self { target: file }
    }

    pub fn into_logger(self) -> Box<dyn Log> {
        Box::new(self)
    }

    /// Best effort attempt to write the log entry to the file
    fn write_entry(&self, record: &Record) -> Result<(), Box<dyn std::error::Error + '_>> {
        if let Some(file) = self.target.as_ref() {
            let mut serialized = serde_json::to_string(&LogEntry::from(record))?;
            serialized.push('\n');

            let mut file_lock = file.lock()?;
            file_lock.write_all(serialized.as_bytes())?;
        }

        Ok(())
    }
}

impl Log for FileLogger {
    fn enabled(&self, metadata: &log::Metadata) -> bool {
        self.target.is_some()
    }

    fn log(&self, record: &Record) {
        let _ = self.write_entry(record);
    }

    fn flush(&self) {
        if let Some(Ok(mut file)) = self.target.as_ref().map(Mutex::lock) {
            let _ = file.flush();
        }
    }
}
