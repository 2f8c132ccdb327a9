//! Checklist-driven workspace worker.
//!
//! The worker polls a workspace's `tasks.md` for pending checklist items and
//! drives each one through a bounded model tool-use loop, committing work in
//! the workspace's git repository and flipping the line to done on
//! completion. The architecture enforces a strict separation:
//!
//! - **[`core`]**: Pure, deterministic logic (task parsing, workspace
//!   classification, the tool catalogue). No I/O, fully testable in isolation.
//! - **[`io`]**: Side-effecting operations (filesystem, git, process
//!   execution, the model service, the record store).
//!
//! Orchestration modules ([`execute`], [`daemon`]) coordinate core logic with
//! I/O. The `coordinator` binary reuses this crate's `io` layer to register
//! workspaces and submit plans.

pub mod core;
pub mod daemon;
pub mod execute;
pub mod io;
pub mod logging;
#[cfg(any(test, feature = "test-support"))]
pub mod test_support;
