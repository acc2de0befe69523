use std::error::Error;
use std::fmt::{Display, Formatter, Result as FmtResult};

/// A failure that no error boundary claimed.
///
/// Once an error has been walked up the whole ancestor chain it is wrapped in
/// this type, so enclosing diff frames pass it straight to the caller instead
/// of walking it again.
#[derive(Debug)]
pub struct Unrecovered(pub anyhow::Error);

impl Unrecovered {
    /// The error that escaped every boundary.
    pub const fn inner(&self) -> &anyhow::Error {
        &self.0
    }

    /// Whether `error` has already been through a boundary walk.
    pub fn is_unrecovered(error: &anyhow::Error) -> bool {
        error.is::<Self>()
    }
}

impl Display for Unrecovered {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> FmtResult {
        write!(formatter, "unrecovered render error: {}", self.0)
    }
}

impl Error for Unrecovered {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        Some(&*self.0)
    }
}
