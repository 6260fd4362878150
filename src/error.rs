//! Load failures and the sink they are reported to.

use thiserror::Error;

/// The only error the registry knows: an asset that could not be fetched or parsed.
#[derive(Debug, Error)]
#[error("Error loading model at {path}: {cause:#}")]
pub struct AssetLoadFailure {
    pub path: String,
    #[source]
    pub cause: anyhow::Error,
}

/// Receives load failures and informational notices. Failures are reported here and
/// then dropped; they never travel further.
pub trait ErrorSink {
    fn report(&self, failure: &AssetLoadFailure);

    fn notice(&self, message: &str);
}

/// Forwards everything to the `log` facade.
#[derive(Clone, Copy, Debug, Default)]
pub struct LogSink;

impl ErrorSink for LogSink {
    fn report(&self, failure: &AssetLoadFailure) {
        log::error!("{}", failure);
    }

    fn notice(&self, message: &str) {
        log::warn!("{}", message);
    }
}

impl<T: ErrorSink + ?Sized> ErrorSink for std::rc::Rc<T> {
    fn report(&self, failure: &AssetLoadFailure) {
        (**self).report(failure);
    }

    fn notice(&self, message: &str) {
        (**self).notice(message);
    }
}
