use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Errors that terminate the process.
#[derive(Debug, Error)]
pub enum Error {
    #[error("could not read config file {}: {source}", .path.display())]
    ConfigRead { path: PathBuf, source: io::Error },
    #[error("invalid config file {}: {source}", .path.display())]
    ConfigParse {
        path: PathBuf,
        source: toml::de::Error,
    },
    #[error("invalid configuration: {0}")]
    Config(String),
    #[error("error connecting to interface {name}: {source}")]
    Device { name: String, source: tun2::Error },
    #[error("could not register interface for readiness notifications: {0}")]
    Readiness(#[source] io::Error),
    #[error("reading data: {0}")]
    Read(#[source] io::Error),
    #[error("writing data: {0}")]
    Write(#[source] io::Error),
    #[error("short write: {written} of {expected} bytes")]
    ShortWrite { written: usize, expected: usize },
    #[error("end of stream on the interface")]
    EndOfStream,
}
