use std::error::Error as StdError;
use std::fmt;
use std::io;

use crate::xmlrpc::client::TransportError;
use crate::xmlrpc::decoder::ParseError;
use crate::xmlrpc::encoding::EncoderError;

pub type Result<T> = ::std::result::Result<T, Error>;

#[derive(Debug)]
pub enum Error {
    Io(io::Error),
    Parse(ParseError),
    Encoder(EncoderError),
    UnknownType(String),
    InvalidSignature(String),
    DateRange(time::error::ComponentRange),
    Transport(TransportError),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match *self {
            Error::Io(ref err) => err.fmt(f),
            Error::Parse(ref err) => err.fmt(f),
            Error::Encoder(ref err) => err.fmt(f),
            Error::UnknownType(ref tag) => write!(f, "unknown type tag \"{}\"", tag),
            Error::InvalidSignature(ref reason) => write!(f, "invalid signature: {}", reason),
            Error::DateRange(ref err) => err.fmt(f),
            Error::Transport(ref err) => err.fmt(f),
        }
    }
}

impl StdError for Error {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        match *self {
            Error::Io(ref err) => Some(err),
            Error::Parse(ref err) => Some(err),
            Error::Encoder(ref err) => Some(err),
            Error::DateRange(ref err) => Some(err),
            Error::Transport(ref err) => Some(err),
            Error::UnknownType(_) | Error::InvalidSignature(_) => None,
        }
    }
}

impl From<io::Error> for Error {
    fn from(err: io::Error) -> Error {
        Error::Io(err)
    }
}

impl From<ParseError> for Error {
    fn from(err: ParseError) -> Error {
        Error::Parse(err)
    }
}

impl From<EncoderError> for Error {
    fn from(err: EncoderError) -> Error {
        Error::Encoder(err)
    }
}

impl From<time::error::ComponentRange> for Error {
    fn from(err: time::error::ComponentRange) -> Error {
        Error::DateRange(err)
    }
}

impl From<TransportError> for Error {
    fn from(err: TransportError) -> Error {
        Error::Transport(err)
    }
}
