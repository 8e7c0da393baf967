use std::fmt::{Display, Formatter};
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};

use crate::error::Error;

/// Numbers one [`Operation`](crate::Operation) applied through a
/// [`SharedRegistry`](crate::SharedRegistry), so that its entry and exit log
/// lines can be paired up even when calls from several threads interleave.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Ord, PartialOrd)]
pub struct CallId(pub usize);

impl Display for CallId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl CallId {
    /// Atomically get the next ID. This wraps around back to zero if you somehow exceed a usize.
    pub fn next() -> CallId {
        static CALL_ID_COUNTER: AtomicUsize = AtomicUsize::new(0);
        CallId(CALL_ID_COUNTER.fetch_add(1, Ordering::Relaxed))
    }
}

/// Log the start of a call, returning its ID.
pub fn log_call(operation: &dyn Display) -> CallId {
    let id = CallId::next();
    info!("->call{id} {operation}");
    id
}

/// Log the result of a call.
pub fn log_return<T>(id: CallId, result: &Result<T, Error>) {
    match result {
        Ok(_) => info!("<-ret{id} ok"),
        Err(err) if err.is_rejection() => warn!("<-ret{id} {err}"),
        Err(err) => error!("<-ret{id} {err}"),
    }
}

/// Set up log4rs from the given configuration file.
pub fn init(config_file: &Path) -> Result<(), Error> {
    log4rs::init_file(config_file, Default::default())
        .map_err(|e| Error::Logging(format!("{}: {e}", config_file.display())))?;
    info!("Initialised logging");
    Ok(())
}
