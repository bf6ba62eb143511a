//! Error handling for vcsync
//!
//! This module provides the error types shared by the command runner, the
//! per-VCS synchronizers and the command line interface. The error system is
//! built around two core principles:
//! 1. **Strongly-typed errors** for precise error handling in library code
//! 2. **User-friendly messages** with actionable suggestions for CLI users
//!
//! # Architecture
//!
//! - [`CommandError`] - Payload describing a failed subprocess (output, exit code, command line)
//! - [`VcsError`] - Enumerated error type for every failure in the crate
//! - [`ErrorContext`] - Wrapper that adds user-friendly details and suggestions
//!
//! # Command failures and timeouts
//!
//! A timed out command is a specialization of a failed command. Both
//! [`VcsError::CommandFailed`] and [`VcsError::CommandTimeout`] carry a
//! [`CommandError`], and [`VcsError::command_error`] returns it for either
//! variant so callers can treat them uniformly:
//!
//! ```rust,no_run
//! use vcsync::run::{run, CommandRequest};
//!
//! let request = CommandRequest::new("git").args(["rev-parse", "HEAD"]);
//! match run(&request, None) {
//!     Ok(sha) => println!("{sha}"),
//!     Err(e) => match e.command_error() {
//!         Some(failure) => eprintln!("git exited with {}", failure.returncode),
//!         None => eprintln!("could not run git: {e}"),
//!     },
//! }
//! ```
//!
//! # CLI display
//!
//! Use [`user_friendly_error`] to convert any [`anyhow::Error`] into an
//! [`ErrorContext`] with contextual suggestions, then call
//! [`ErrorContext::display`] to print it with colors.

use colored::Colorize;
use std::fmt;
use thiserror::Error;

/// Result type used throughout the library.
pub type Result<T, E = VcsError> = std::result::Result<T, E>;

/// Details of a subprocess that exited unsuccessfully.
///
/// `output` holds the normalized text selected by the runner (stderr for a
/// nonzero exit), `returncode` the child's exit code (`-1` for timeouts and
/// signal deaths) and `cmd` the space-joined argument vector.
///
/// The [`Display`](fmt::Display) rendering is
/// `Command failed with code {returncode}: {cmd}`, followed by a newline and
/// the captured output when the output is not empty.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandError {
    /// Normalized output captured from the child process
    pub output: String,
    /// Exit code reported by the child process
    pub returncode: i32,
    /// Space-joined rendering of the argument vector
    pub cmd: String,
}

impl CommandError {
    /// Create a new command error payload.
    pub fn new(output: impl Into<String>, returncode: i32, cmd: impl Into<String>) -> Self {
        Self {
            output: output.into(),
            returncode,
            cmd: cmd.into(),
        }
    }
}

impl fmt::Display for CommandError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Command failed with code {}: {}", self.returncode, self.cmd)?;
        if !self.output.is_empty() {
            write!(f, "\n{}", self.output)?;
        }
        Ok(())
    }
}

impl std::error::Error for CommandError {}

/// The main error type for vcsync operations
///
/// # Error Categories
///
/// ## Command execution
/// - [`CommandFailed`] - A subprocess exited with a nonzero code
/// - [`CommandTimeout`] - A subprocess exceeded its timeout and was killed
/// - [`Io`] - The subprocess could not be spawned or its pipes failed
/// - [`BinaryNotFound`] - A VCS binary is not available on `PATH`
///
/// ## Repository state
/// - [`Parse`] - VCS output did not match the expected format
/// - [`RemoteRefNotFound`] - `show-ref` output lacked the remote ref line
/// - [`RemoteOriginMissing`] - A git handle was built without an origin
/// - [`RemoteSetFailed`] - A remote was not present after being configured
///
/// ## Dispatch and URLs
/// - [`InvalidVcs`], [`NoVcsForUrl`], [`MultipleVcsForUrl`], [`VcsNotSupported`]
/// - [`MalformedUrl`] - A pip-style URL could not be split
///
/// ## Configuration
/// - [`Config`], [`Toml`], [`Yaml`], [`Semver`]
///
/// [`CommandFailed`]: VcsError::CommandFailed
/// [`CommandTimeout`]: VcsError::CommandTimeout
/// [`Io`]: VcsError::Io
/// [`BinaryNotFound`]: VcsError::BinaryNotFound
/// [`Parse`]: VcsError::Parse
/// [`RemoteRefNotFound`]: VcsError::RemoteRefNotFound
/// [`RemoteOriginMissing`]: VcsError::RemoteOriginMissing
/// [`RemoteSetFailed`]: VcsError::RemoteSetFailed
/// [`InvalidVcs`]: VcsError::InvalidVcs
/// [`NoVcsForUrl`]: VcsError::NoVcsForUrl
/// [`MultipleVcsForUrl`]: VcsError::MultipleVcsForUrl
/// [`VcsNotSupported`]: VcsError::VcsNotSupported
/// [`MalformedUrl`]: VcsError::MalformedUrl
/// [`Config`]: VcsError::Config
/// [`Toml`]: VcsError::Toml
/// [`Yaml`]: VcsError::Yaml
/// [`Semver`]: VcsError::Semver
#[derive(Error, Debug)]
pub enum VcsError {
    /// Command exited with a nonzero code
    #[error(transparent)]
    CommandFailed(CommandError),

    /// Command exceeded its timeout and was killed
    #[error(transparent)]
    CommandTimeout(CommandError),

    /// VCS binary not found
    #[error("{bin} is not installed or not found in PATH")]
    BinaryNotFound {
        /// Name of the missing executable
        bin: String,
    },

    /// Unexpected output from a VCS command
    #[error("Could not parse {what}: {reason}")]
    Parse {
        /// What was being parsed (e.g. "git status")
        what: String,
        /// Why parsing failed
        reason: String,
    },

    /// `show-ref` reported a remote ref that could not be split
    #[error("Could not fetch remote names for '{reference}'")]
    RemoteRefNotFound {
        /// The ref being resolved
        reference: String,
    },

    /// No origin remote and no URL to derive one from
    #[error("Missing origin remote for repository at {path}")]
    RemoteOriginMissing {
        /// Working copy path
        path: String,
    },

    /// Remote still missing after `remote add`/`set-url`
    #[error("Remote '{name}' not found after setting")]
    RemoteSetFailed {
        /// Remote name
        name: String,
    },

    /// Unknown VCS discriminant
    #[error("VCS '{vcs}' is not a valid VCS")]
    InvalidVcs {
        /// The rejected discriminant
        vcs: String,
    },

    /// URL detection found nothing
    #[error("No VCS found for url: {url}")]
    NoVcsForUrl {
        /// The URL that was inspected
        url: String,
    },

    /// URL detection was ambiguous
    #[error("Multiple VCS found for url: {url}")]
    MultipleVcsForUrl {
        /// The URL that was inspected
        url: String,
    },

    /// VCS recognized but not registered
    #[error("VCS '{vcs}' is not supported for url: {url}")]
    VcsNotSupported {
        /// The URL that was inspected
        url: String,
        /// The detected VCS
        vcs: String,
    },

    /// Pip-style URL could not be parsed
    #[error("Repo {url} is malformed: {reason}")]
    MalformedUrl {
        /// The offending URL
        url: String,
        /// What is wrong with it
        reason: String,
    },

    /// Configuration error
    #[error("Configuration error: {message}")]
    Config {
        /// Description of the configuration problem
        message: String,
    },

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// TOML parsing error
    #[error("TOML parsing error: {0}")]
    Toml(#[from] toml::de::Error),

    /// YAML parsing error
    #[error("YAML parsing error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// Semver parsing error
    #[error("Semver parsing error: {0}")]
    Semver(#[from] semver::Error),

    /// Other error
    #[error("{message}")]
    Other {
        /// Generic error message
        message: String,
    },
}

impl VcsError {
    /// Returns the command failure payload for both failed and timed out commands.
    #[must_use]
    pub const fn command_error(&self) -> Option<&CommandError> {
        match self {
            Self::CommandFailed(e) | Self::CommandTimeout(e) => Some(e),
            _ => None,
        }
    }

    /// True when the error is a command timeout.
    #[must_use]
    pub const fn is_timeout(&self) -> bool {
        matches!(self, Self::CommandTimeout(_))
    }
}

impl Clone for VcsError {
    fn clone(&self) -> Self {
        match self {
            Self::CommandFailed(e) => Self::CommandFailed(e.clone()),
            Self::CommandTimeout(e) => Self::CommandTimeout(e.clone()),
            Self::BinaryNotFound {
                bin,
            } => Self::BinaryNotFound {
                bin: bin.clone(),
            },
            Self::Parse {
                what,
                reason,
            } => Self::Parse {
                what: what.clone(),
                reason: reason.clone(),
            },
            Self::RemoteRefNotFound {
                reference,
            } => Self::RemoteRefNotFound {
                reference: reference.clone(),
            },
            Self::RemoteOriginMissing {
                path,
            } => Self::RemoteOriginMissing {
                path: path.clone(),
            },
            Self::RemoteSetFailed {
                name,
            } => Self::RemoteSetFailed {
                name: name.clone(),
            },
            Self::InvalidVcs {
                vcs,
            } => Self::InvalidVcs {
                vcs: vcs.clone(),
            },
            Self::NoVcsForUrl {
                url,
            } => Self::NoVcsForUrl {
                url: url.clone(),
            },
            Self::MultipleVcsForUrl {
                url,
            } => Self::MultipleVcsForUrl {
                url: url.clone(),
            },
            Self::VcsNotSupported {
                url,
                vcs,
            } => Self::VcsNotSupported {
                url: url.clone(),
                vcs: vcs.clone(),
            },
            Self::MalformedUrl {
                url,
                reason,
            } => Self::MalformedUrl {
                url: url.clone(),
                reason: reason.clone(),
            },
            Self::Config {
                message,
            } => Self::Config {
                message: message.clone(),
            },
            // For errors that don't implement Clone, convert to Other
            Self::Io(e) => Self::Other {
                message: format!("IO error: {e}"),
            },
            Self::Toml(e) => Self::Other {
                message: format!("TOML parsing error: {e}"),
            },
            Self::Yaml(e) => Self::Other {
                message: format!("YAML parsing error: {e}"),
            },
            Self::Semver(e) => Self::Other {
                message: format!("Semver parsing error: {e}"),
            },
            Self::Other {
                message,
            } => Self::Other {
                message: message.clone(),
            },
        }
    }
}

/// Error context wrapper that provides user-friendly error information
///
/// When displayed, errors show:
/// 1. **Error**: The main error message in red
/// 2. **Details**: Additional context about the error in yellow (optional)
/// 3. **Suggestion**: Actionable steps to resolve the issue in green (optional)
///
/// # Examples
///
/// ```rust,no_run
/// use vcsync::core::{ErrorContext, VcsError};
///
/// let context = ErrorContext::new(VcsError::BinaryNotFound { bin: "hg".into() })
///     .with_suggestion("Install Mercurial from https://www.mercurial-scm.org/")
///     .with_details("Repositories with vcs = \"hg\" are synchronized with the hg binary");
///
/// context.display();
/// ```
#[derive(Debug)]
pub struct ErrorContext {
    /// The underlying error
    pub error: VcsError,
    /// Optional suggestion for resolving the error
    pub suggestion: Option<String>,
    /// Optional additional details about the error
    pub details: Option<String>,
}

impl ErrorContext {
    /// Create a new error context with no suggestion or details.
    #[must_use]
    pub const fn new(error: VcsError) -> Self {
        Self {
            error,
            suggestion: None,
            details: None,
        }
    }

    /// Add a suggestion for resolving the error
    pub fn with_suggestion(mut self, suggestion: impl Into<String>) -> Self {
        self.suggestion = Some(suggestion.into());
        self
    }

    /// Add additional details explaining the error
    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }

    /// Display the error context to stderr with terminal colors
    ///
    /// - Error message: Red and bold
    /// - Details: Yellow
    /// - Suggestion: Green
    pub fn display(&self) {
        eprintln!("{}: {}", "error".red().bold(), self.error);

        if let Some(details) = &self.details {
            eprintln!("{}: {}", "details".yellow(), details);
        }

        if let Some(suggestion) = &self.suggestion {
            eprintln!("{}: {}", "suggestion".green(), suggestion);
        }
    }
}

impl fmt::Display for ErrorContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.error)?;

        if let Some(details) = &self.details {
            write!(f, "\nDetails: {details}")?;
        }

        if let Some(suggestion) = &self.suggestion {
            write!(f, "\nSuggestion: {suggestion}")?;
        }

        Ok(())
    }
}

impl std::error::Error for ErrorContext {}

/// Convert any error to a user-friendly [`ErrorContext`] with actionable suggestions
///
/// Recognizes [`VcsError`] (directly or anywhere in the `anyhow` chain),
/// [`std::io::Error`] and [`toml::de::Error`]. Anything else is rendered with
/// its full context chain.
#[must_use]
pub fn user_friendly_error(error: anyhow::Error) -> ErrorContext {
    if let Some(ctx) = error.downcast_ref::<ErrorContext>() {
        return ErrorContext {
            error: ctx.error.clone(),
            suggestion: ctx.suggestion.clone(),
            details: ctx.details.clone(),
        };
    }

    for cause in error.chain() {
        if let Some(vcs_error) = cause.downcast_ref::<VcsError>() {
            return create_error_context(vcs_error.clone());
        }
    }

    if let Some(io_error) = error.downcast_ref::<std::io::Error>() {
        match io_error.kind() {
            std::io::ErrorKind::PermissionDenied => {
                return ErrorContext::new(VcsError::Other {
                    message: format!("Permission denied: {error:#}"),
                })
                .with_suggestion("Check the ownership and permissions of the working copy");
            }
            std::io::ErrorKind::NotFound => {
                return ErrorContext::new(VcsError::Other {
                    message: format!("Not found: {error:#}"),
                })
                .with_suggestion("Check that the path exists and that the VCS binary is installed");
            }
            _ => {}
        }
    }

    if let Some(toml_error) = error.downcast_ref::<toml::de::Error>() {
        return ErrorContext::new(VcsError::Config {
            message: toml_error.to_string(),
        })
        .with_suggestion("Check the TOML syntax of your vcsync configuration file");
    }

    ErrorContext::new(VcsError::Other {
        message: format!("{error:#}"),
    })
}

fn create_error_context(error: VcsError) -> ErrorContext {
    let (suggestion, details): (Option<&'static str>, Option<String>) = match &error {
        VcsError::BinaryNotFound {
            bin,
        } => {
            let suggestion = match bin.as_str() {
                "git" => "Install git from https://git-scm.com/ and make sure it is on your PATH",
                "hg" => "Install Mercurial from https://www.mercurial-scm.org/",
                "svn" => "Install Subversion from https://subversion.apache.org/",
                _ => "Install the missing program and make sure it is on your PATH",
            };
            (Some(suggestion), None)
        }
        VcsError::CommandTimeout(_) => (
            Some("The command may be waiting on the network or on a credential prompt; try it manually"),
            None,
        ),
        VcsError::CommandFailed(e) => (None, Some(format!("exit code {}", e.returncode))),
        VcsError::NoVcsForUrl {
            ..
        }
        | VcsError::MultipleVcsForUrl {
            ..
        } => (
            Some("Prefix the url with git+, hg+ or svn+, or set `vcs` explicitly in the configuration"),
            None,
        ),
        VcsError::MalformedUrl {
            ..
        } => (
            Some("Use the form <vcs>+<protocol>://<url>[@rev], e.g. git+https://github.com/user/repo.git@main"),
            None,
        ),
        VcsError::Config {
            ..
        }
        | VcsError::Toml(_)
        | VcsError::Yaml(_) => {
            (Some("Check ~/.vcsync/config.toml or the file passed with --config"), None)
        }
        _ => (None, None),
    };

    let mut context = ErrorContext::new(error);
    if let Some(suggestion) = suggestion {
        context = context.with_suggestion(suggestion);
    }
    if let Some(details) = details {
        context = context.with_details(details);
    }
    context
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_command_error_display_with_output() {
        let err = CommandError::new("fatal: not a git repository", 128, "git status");
        assert_eq!(
            err.to_string(),
            "Command failed with code 128: git status\nfatal: not a git repository"
        );
    }

    #[test]
    fn test_command_error_display_without_output() {
        let err = CommandError::new("", 1, "false");
        assert_eq!(err.to_string(), "Command failed with code 1: false");
    }

    #[test]
    fn test_timeout_is_a_command_error() {
        let err = VcsError::CommandTimeout(CommandError::new("Command timed out", -1, "sleep 10"));
        assert!(err.is_timeout());
        let payload = err.command_error().expect("timeout carries a command error");
        assert_eq!(payload.returncode, -1);
        assert!(err.to_string().starts_with("Command failed with code -1: sleep 10"));
    }

    #[test]
    fn test_non_command_errors_have_no_payload() {
        let err = VcsError::InvalidVcs {
            vcs: "cvs".to_string(),
        };
        assert!(err.command_error().is_none());
        assert!(!err.is_timeout());
    }

    #[test]
    fn test_clone_converts_io_to_other() {
        let err = VcsError::Io(std::io::Error::other("boom"));
        match err.clone() {
            VcsError::Other {
                message,
            } => assert!(message.contains("boom")),
            other => panic!("unexpected clone result: {other:?}"),
        }
    }

    #[test]
    fn test_user_friendly_error_finds_vcs_error_in_chain() {
        let err = anyhow::Error::from(VcsError::BinaryNotFound {
            bin: "hg".to_string(),
        })
        .context("Failed to sync 'dotfiles'");
        let ctx = user_friendly_error(err);
        assert!(matches!(ctx.error, VcsError::BinaryNotFound { .. }));
        assert!(ctx.suggestion.unwrap().contains("Mercurial"));
    }

    #[test]
    fn test_user_friendly_error_generic() {
        let ctx = user_friendly_error(anyhow::anyhow!("Something went wrong"));
        assert!(ctx.to_string().contains("Something went wrong"));
        assert!(ctx.suggestion.is_none());
    }

    #[test]
    fn test_error_context_display_format() {
        let ctx = ErrorContext::new(VcsError::Other {
            message: "failed".to_string(),
        })
        .with_details("because")
        .with_suggestion("retry");
        assert_eq!(ctx.to_string(), "failed\nDetails: because\nSuggestion: retry");
    }
}
