//! Per-subcommand request builders for git, Mercurial and Subversion.
//!
//! These types only translate named options into argument vectors. Each
//! method returns a [`CommandRequest`](crate::run::CommandRequest) bound to
//! the working copy, with `check_returncode` preset for the call site; the
//! caller decides which runner executes it.
//!
//! ```rust
//! use vcsync::cmd::Git;
//!
//! let git = Git::new("/srv/checkouts/libvcs");
//! let request = git.rev_list_one("HEAD");
//! assert_eq!(request.render(), "git rev-list --max-count=1 HEAD");
//! ```

pub mod git;
pub mod hg;
pub mod svn;

pub use git::{CloneOptions, Git};
pub use hg::Hg;
pub use svn::{Svn, SvnOptions};
