use std::{error::Error, fmt::Display};

use crate::receiver::ReceiverError;

#[allow(missing_docs)]
#[derive(Debug)]
pub enum GuiError {
    IOError(std::io::Error),
    ReceiverError(ReceiverError),
}

impl Display for GuiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            GuiError::IOError(e) => write!(f, "terminal error: {}", e),
            GuiError::ReceiverError(e) => write!(f, "{}", e),
        }
    }
}

impl Error for GuiError {}

impl From<std::io::Error> for GuiError {
    fn from(value: std::io::Error) -> Self {
        Self::IOError(value)
    }
}

impl From<ReceiverError> for GuiError {
    fn from(value: ReceiverError) -> Self {
        Self::ReceiverError(value)
    }
}
