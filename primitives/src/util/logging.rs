use std::{io, io::Write};

use slog::{o, Discard, Drain, Logger, OwnedKVList, Record, KV};
use slog_term::{
    timestamp_utc, CountingWriter, Decorator, RecordDecorator, Serializer, ThreadSafeTimestampFn,
};

pub use slog_async::Async;
pub use slog_term::{PlainSyncDecorator, TermDecorator};

/// A single-line format which puts a fixed `prefix` (the name of the process)
/// between the level and the message:
///
/// ```text
/// 2024-01-01T00:00:00.000000000Z INFO adspots: Listening on socket address: 127.0.0.1:8081!, main: run
/// ```
pub struct PrefixedFormat<D>
where
    D: Decorator,
{
    decorator: D,
    fn_timestamp: Box<dyn ThreadSafeTimestampFn<Output = io::Result<()>>>,
    prefix: String,
}

impl<D> Drain for PrefixedFormat<D>
where
    D: Decorator,
{
    type Ok = ();
    type Err = io::Error;

    fn log(&self, record: &Record<'_>, values: &OwnedKVList) -> Result<Self::Ok, Self::Err> {
        self.decorator.with_record(record, values, |decorator| {
            let comma_needed = self.write_header(decorator, record)?;

            {
                let mut serializer = Serializer::new(decorator, comma_needed, false);

                record.kv().serialize(record, &mut serializer)?;
                values.serialize(record, &mut serializer)?;

                serializer.finish()?;
            }

            decorator.start_whitespace()?;
            writeln!(decorator)?;

            decorator.flush()
        })
    }
}

impl<D> PrefixedFormat<D>
where
    D: Decorator,
{
    pub fn new(prefix: &str, decorator: D) -> Self {
        Self {
            decorator,
            fn_timestamp: Box::new(timestamp_utc),
            prefix: prefix.to_owned(),
        }
    }

    /// Writes `timestamp LEVEL prefix: message` and
    /// returns whether the key-values need a leading comma.
    fn write_header(
        &self,
        mut rd: &mut dyn RecordDecorator,
        record: &Record<'_>,
    ) -> io::Result<bool> {
        rd.start_timestamp()?;
        (self.fn_timestamp)(&mut rd)?;
        space(rd)?;

        rd.start_level()?;
        write!(rd, "{}", record.level().as_short_str())?;
        space(rd)?;

        rd.start_msg()?;
        write!(rd, "{}:", self.prefix)?;
        space(rd)?;

        rd.start_msg()?;
        let mut counting = CountingWriter::new(&mut rd);
        write!(counting, "{}", record.msg())?;

        Ok(counting.count() != 0)
    }
}

fn space(rd: &mut dyn RecordDecorator) -> io::Result<()> {
    rd.start_whitespace()?;
    write!(rd, " ")
}

/// Terminal logger with asynchronous writing, every line prefixed with `prefix`.
pub fn new_logger(prefix: &str) -> Logger {
    let decorator = TermDecorator::new().build();
    let drain = PrefixedFormat::new(prefix, decorator).fuse();
    let drain = Async::new(drain).build().fuse();

    Logger::root(drain, o!())
}

/// A logger that drops every record, for tests.
pub fn discard_logger() -> Logger {
    Logger::root(Discard, o!())
}
