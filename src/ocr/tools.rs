//! Helpers for invoking the Poppler and Tesseract command-line tools.

use std::path::{Path, PathBuf};
use std::process::{ExitStatus, Output};

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Poppler binaries used for native extraction and rasterization.
pub const POPPLER_TOOLS: [&str; 3] = ["pdfinfo", "pdftotext", "pdftoppm"];

/// Failure running an external tool.
#[derive(Debug, Error)]
pub enum ToolError {
    #[error("External tool not found: {0}")]
    NotFound(String),

    #[error("{0}")]
    Failed(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Where to find the external toolchain.
///
/// Unset paths resolve through `PATH`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolPaths {
    /// Directory containing `pdfinfo`, `pdftotext` and `pdftoppm`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub poppler_path: Option<PathBuf>,
    /// Full path to the `tesseract` executable.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tesseract_cmd: Option<PathBuf>,
}

impl ToolPaths {
    /// Resolve a Poppler binary by name.
    pub fn poppler(&self, tool: &str) -> PathBuf {
        match &self.poppler_path {
            Some(dir) => dir.join(tool),
            None => PathBuf::from(tool),
        }
    }

    /// Resolve the Tesseract binary.
    pub fn tesseract(&self) -> PathBuf {
        self.tesseract_cmd
            .clone()
            .unwrap_or_else(|| PathBuf::from("tesseract"))
    }

    /// Availability of every tool the pipeline may call, in a stable order.
    pub fn check_all(&self) -> Vec<(String, bool)> {
        let mut tools: Vec<(String, bool)> = POPPLER_TOOLS
            .iter()
            .map(|tool| (tool.to_string(), check_binary(&self.poppler(tool))))
            .collect();
        tools.push(("tesseract".to_string(), check_binary(&self.tesseract())));
        tools
    }
}

/// Check if a binary is available, either as an explicit path or in `PATH`.
pub fn check_binary(binary: &Path) -> bool {
    if binary.components().count() > 1 {
        return binary.is_file();
    }
    which::which(binary).is_ok()
}

/// Handle command output, extracting stdout on success or returning appropriate error.
pub fn handle_cmd_output(
    result: std::io::Result<Output>,
    tool_name: &str,
    error_prefix: &str,
) -> Result<String, ToolError> {
    match result {
        Ok(output) => {
            if output.status.success() {
                Ok(String::from_utf8_lossy(&output.stdout).to_string())
            } else {
                let stderr = String::from_utf8_lossy(&output.stderr);
                Err(ToolError::Failed(format!(
                    "{}: {}",
                    error_prefix,
                    stderr.trim()
                )))
            }
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            Err(ToolError::NotFound(tool_name.to_string()))
        }
        Err(e) => Err(ToolError::Io(e)),
    }
}

/// Check command status, returning appropriate error on failure.
pub fn check_cmd_status(
    result: std::io::Result<ExitStatus>,
    tool_name: &str,
    error_msg: &str,
) -> Result<(), ToolError> {
    match result {
        Ok(s) if s.success() => Ok(()),
        Ok(_) => Err(ToolError::Failed(error_msg.to_string())),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            Err(ToolError::NotFound(tool_name.to_string()))
        }
        Err(e) => Err(ToolError::Io(e)),
    }
}


/// Stand-in executables for exercising the command runners.
#[cfg(all(test, unix))]
pub(crate) mod fake_tools {
    use std::os::unix::fs::PermissionsExt;
    use std::path::{Path, PathBuf};

    /// Write an executable `sh` script named `name` into `dir`.
    pub fn write_script(dir: &Path, name: &str, body: &str) -> PathBuf {
        let path = dir.join(name);
        std::fs::write(&path, format!("#!/bin/sh\n{}\n", body)).unwrap();
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
        path
    }

    /// `pdfinfo` that reports `pages` pages.
    pub fn pdfinfo(dir: &Path, pages: u32) -> PathBuf {
        write_script(
            dir,
            "pdfinfo",
            &format!("printf 'Producer:       fake\\nPages:          {}\\n'", pages),
        )
    }
}
