use thiserror::Error;

/// Reasons a batch run refuses to start. Nothing is launched when one of these is returned.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Please select at least one file to process.")]
    NoFiles,

    #[error("Please specify the output directory.")]
    NoOutputDirectory,

    #[error("No audio channels selected for '{file}'. Please select at least one channel or remove the file from the list.")]
    NoChannelsSelected { index: usize, file: String },

    #[error("A batch is already running.")]
    AlreadyRunning,
}

impl ValidationError {
    /// Console text. Only a file without channels is flagged as an error.
    pub fn console_message(&self) -> String {
        match self {
            ValidationError::NoChannelsSelected { .. } => format!("ERROR: {}", self),
            _ => self.to_string(),
        }
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CommandError {
    #[error("no channels selected")]
    NoChannelsSelected,
}
