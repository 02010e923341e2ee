use std::error::Error;
use std::fmt::{self, Debug, Display, Formatter};

/// Out of memory error, returned when a node block can't be allocated.
pub struct OOMError {}

impl OOMError {
    pub(crate) fn new() -> Self {
        Self {}
    }
}

impl Debug for OOMError {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_struct("Allocator is out of memory!").finish()
    }
}

impl Display for OOMError {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "Allocator is out of memory!")
    }
}

impl Error for OOMError {}
