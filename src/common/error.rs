use snafu::prelude::*;

#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
pub enum Error {
    /// Bad reference workbook or run selection. Raised before any network
    /// activity.
    #[snafu(display("Invalid input: {message}"))]
    InputError { message: String },

    #[snafu(display("{method} {url} failed: {source}"))]
    RequestError {
        url: String,
        method: String,
        source: ureq::Error,
    },

    #[snafu(display("{message}"))]
    ResponseError { message: String },

    /// Failure scoped to a single endpoint scan. The service records these
    /// in the run report instead of aborting the batch.
    #[snafu(display("{endpoint}: {message}: {source}"))]
    EndpointError {
        endpoint: String,
        message: String,
        source: Box<dyn std::error::Error>,
    },

    #[snafu(display("Export failed: {message}: {source}"))]
    ExportError {
        message: String,
        source: Box<dyn std::error::Error>,
    },

    #[snafu(display("Cannot use {customer:?} as a sheet name: {message}"))]
    SheetNameError { customer: String, message: String },

    #[snafu(display("Invalid configuration for {prefix}: {message}"))]
    ConfigError { prefix: String, message: String },
}

pub type Result<T> = std::result::Result<T, Error>;
