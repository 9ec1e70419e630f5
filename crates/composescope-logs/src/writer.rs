use std::io::Write;

use parking_lot::Mutex;
use tracing::debug;
use unicode_width::UnicodeWidthStr;

use crate::consumer::LogConsumer;

struct Output<W> {
    out: W,

    /// Display width of the widest service name seen so far
    width: usize,
}

/// Writes each line to an output stream, prefixed with its service name
pub struct WriterConsumer<W> {
    output: Mutex<Output<W>>,
    prefix: bool,
}

impl<W: Write + Send> WriterConsumer<W> {
    pub fn new(out: W) -> Self {
        Self {
            output: Mutex::new(Output { out, width: 0 }),
            prefix: true,
        }
    }

    /// Write bare lines without the `service |` prefix
    pub fn with_prefix(mut self, prefix: bool) -> Self {
        self.prefix = prefix;
        self
    }

    /// Pre-size the prefix column so known services line up from the first line
    pub fn with_services<I, S>(self, services: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        {
            let mut output = self.output.lock();
            for service in services {
                output.width = output.width.max(service.as_ref().width());
            }
        }
        self
    }

    pub fn into_inner(self) -> W {
        self.output.into_inner().out
    }
}

impl<W: Write + Send> LogConsumer for WriterConsumer<W> {
    fn log(&self, service: &str, line: &str) {
        let mut output = self.output.lock();
        let result = if self.prefix {
            output.width = output.width.max(service.width());
            let pad = output.width - service.width();
            writeln!(output.out, "{}{} | {}", service, " ".repeat(pad), line)
        } else {
            writeln!(output.out, "{}", line)
        };

        if let Err(e) = result {
            debug!(error = %e, service, "failed to write log line");
        }
    }
}
