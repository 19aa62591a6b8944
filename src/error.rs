use camino::Utf8PathBuf;
use miette::Diagnostic;
use thiserror::Error;

#[derive(Debug, Error, Diagnostic)]
pub enum InstallError {
    #[error("all input fields are required")]
    MissingInputs,

    #[error("Steam Workshop path is invalid: '{0}'")]
    InvalidBasePath(Utf8PathBuf),

    #[error("could not extract Workshop ID from '{0}'")]
    InvalidItemId(String),

    #[error(
        "Workshop item folder not found at:\n{0}\nEnsure you are subscribed to the dummy item and it has downloaded."
    )]
    ItemFolderNotFound(Utf8PathBuf),

    #[error("timeout fetching vehicle XML")]
    FetchTimeout,

    #[error("failed fetching vehicle XML: {0}")]
    FetchTransport(String),

    #[error("vehicle XML source returned status {status}: {message}")]
    FetchStatus { status: u16, message: String },

    #[error("source content does not appear to be valid XML")]
    NotXml,

    #[error("failed parsing vehicle XML: {0}")]
    MalformedXml(String),

    #[error("XML is not a valid Stormworks vehicle file (root is <{found}>, expected <vehicle>)")]
    WrongRoot { found: String },

    #[error("failed writing vehicle.xml to {path}: {message}")]
    WriteFailed { path: Utf8PathBuf, message: String },

    #[error("failed to read config file at {0}")]
    ConfigRead(Utf8PathBuf),

    #[error("failed to parse config file: {0}")]
    ConfigParse(String),

    #[error("failed to write config file at {path}: {message}")]
    ConfigWrite { path: Utf8PathBuf, message: String },

    #[error("a critical unexpected error occurred: {0}")]
    Unexpected(String),
}
