use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::process::Command;

use tracing::{info, warn};

use crate::processing::ConvertError;

pub const DEFAULT_UPLOADER: &str = "gupload";
pub const ACTIVITY_NAME: &str = "X-trainer indoor cycling";
pub const ACTIVITY_TYPE: &str = "indoor_cycling";

/// Sends a written TCX file to Garmin Connect.
pub trait Uploader {
    fn upload(&self, file: &Path) -> Result<(), ConvertError>;
}

/// Uploads by running a garmin-uploader compatible program.
///
/// Credentials are passed on the command line and are visible to other local
/// users through the process list. Leave them unset to let `gupload` read its
/// own `~/.guploadrc`; `-u` and `-p` are then omitted.
#[derive(Debug, Clone)]
pub struct CommandUploader {
    pub program: OsString,
    pub username: Option<String>,
    pub password: Option<String>,
    pub verbose: bool,
}

impl Default for CommandUploader {
    fn default() -> Self {
        Self {
            program: DEFAULT_UPLOADER.into(),
            username: None,
            password: None,
            verbose: false,
        }
    }
}

impl CommandUploader {
    pub fn command(&self, file: &Path) -> Command {
        let mut command = Command::new(&self.program);
        if let Some(username) = &self.username {
            command.arg("-u").arg(username);
        }
        if let Some(password) = &self.password {
            command.arg("-p").arg(password);
        }
        command
            .arg("-a")
            .arg(ACTIVITY_NAME)
            .arg("-t")
            .arg(ACTIVITY_TYPE)
            .arg("-v")
            .arg(if self.verbose { "5" } else { "2" })
            .arg(file);
        command
    }
}

impl Uploader for CommandUploader {
    fn upload(&self, file: &Path) -> Result<(), ConvertError> {
        let upload_error = |reason: String| ConvertError::Upload {
            file: file.to_path_buf(),
            reason,
        };

        let status = self.command(file).status().map_err(|err| {
            upload_error(format!(
                "could not run {}: {err}",
                self.program.to_string_lossy()
            ))
        })?;

        if status.success() {
            Ok(())
        } else {
            Err(upload_error(format!(
                "{} exited with {status}",
                self.program.to_string_lossy()
            )))
        }
    }
}

/// Upload every file in order, stopping at the first failure.
///
/// Returns the number of files uploaded.
pub fn upload_all(uploader: &dyn Uploader, files: &[PathBuf]) -> Result<usize, ConvertError> {
    for (idx, file) in files.iter().enumerate() {
        if let Err(err) = uploader.upload(file) {
            warn!(file = %file.display(), error = %err, uploaded = idx, "upload failed");
            return Err(err);
        }
        info!(file = %file.display(), "uploaded activity");
    }
    Ok(files.len())
}
