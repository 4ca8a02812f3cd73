//! Fork-safety coordination.
//!
//! `fork` copies the whole address space but only the calling thread. A lock
//! held by any other thread is copied in its held state, and nothing in the
//! child can ever release it. This module runs hooks around each fork that
//! make the forking thread the only possible holder:
//!
//! 1. **before fork** (forking thread): acquire every guarded lock. The fork
//!    waits for in-flight critical sections on other threads to finish.
//! 2. **after fork, parent**: release the locks again.
//! 3. **after fork, child**: release the copies. The child's thread is a copy
//!    of the forking thread, so it is their recorded holder.
//!
//! Hooks live in an explicit [`HookRegistry`] that a [`Duplicator`] runs on
//! every [`Duplicator::duplicate`] call.

mod duplicate;
mod handler;
mod registry;
mod wait;


pub use duplicate::{Duplication, Duplicator, exit_child};
pub use handler::{ForkGuard, ForkHandler};
pub use nix::unistd::Pid;
pub use registry::{ForkSide, HookRegistry};
pub use wait::{ChildStatus, wait_for_child};
