use std::path::Path;

/// A progress event pushed from the install pipeline.
///
/// `Progress` counts whole units (files, stages) while `Bytes` reports
/// byte-level progress of a single transfer. Handlers are invoked from the
/// I/O path and must not block.
#[derive(Debug, Clone)]
pub enum Event {
    Status(String),
    Progress { current: u64, total: u64 },
    Bytes { file: String, current: u64, total: u64 },
}

pub trait Reporter: Send + Sync {
    fn send(&self, event: Event);
}

impl<F> Reporter for F
where
    F: Fn(Event) + Send + Sync,
{
    fn send(&self, event: Event) {
        self(event)
    }
}

/// Convenience methods over an optional reporter so call sites do not
/// need to match on `Option` themselves.
pub trait Report {
    fn status(&self, message: impl Into<String>);
    fn progress(&self, current: u64, total: u64);
    fn bytes(&self, file: &Path, current: u64, total: u64);
}

impl Report for Option<&dyn Reporter> {
    fn status(&self, message: impl Into<String>) {
        if let Some(reporter) = self {
            reporter.send(Event::Status(message.into()));
        }
    }

    fn progress(&self, current: u64, total: u64) {
        if let Some(reporter) = self {
            reporter.send(Event::Progress { current, total });
        }
    }

    fn bytes(&self, file: &Path, current: u64, total: u64) {
        if let Some(reporter) = self {
            reporter.send(Event::Bytes {
                file: file.to_string_lossy().into_owned(),
                current,
                total,
            });
        }
    }
}

/// Shorthand for "no reporter" at call sites.
pub const NR: Option<&dyn Reporter> = None;
