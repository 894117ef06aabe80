/*
** Copyright (C) 2026 Sylvain Fargier
**
** This software is provided 'as-is', without any express or implied
** warranty.  In no event will the authors be held liable for any damages
** arising from the use of this software.
**
** Permission is granted to anyone to use this software for any purpose,
** including commercial applications, and to alter it and redistribute it
** freely, subject to the following restrictions:
**
** 1. The origin of this software must not be misrepresented; you must not
**    claim that you wrote the original software. If you use this software
**    in a product, an acknowledgment in the product documentation would be
**    appreciated but is not required.
** 2. Altered source versions must be plainly marked as such, and must not be
**    misrepresented as being the original software.
** 3. This notice may not be removed or altered from any source distribution.
**
** Created on: 2026-06-18T10:17:31
** Author: Sylvain Fargier <fargier.sylvain@gmail.com>
*/

use std::{path::Path, time::Duration};

use anyhow::Result;
use libc::pid_t;

use crate::{config::Config, utils::signal::Signal};

mod ident;
pub use ident::Identity;

mod os;
pub use os::OsProcess;

/// Liveness poll period while waiting on a process
pub const POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Result of waiting on a process
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum WaitOutcome {
    Exited,
    TimedOut,
}

/// Capability surface over one OS process
///
/// The controller needs nothing more than these operations, [OsProcess]
/// implements them against the system, tests substitute their own.
pub trait ProcessHandle: Sized {
    /// Attach to a recorded process id
    fn adopt(pid: pid_t) -> Self;

    /// Launch the configured daemon, detached in its own session
    fn spawn(config: &Config, identity: Option<&Identity>) -> Result<Self>;

    fn pid(&self) -> pid_t;

    /// Probe for liveness, a permission error still counts as alive
    fn is_alive(&self) -> bool;

    /// Check that the process actually runs `daemon`
    ///
    /// `None` when the process table cannot answer
    fn matches(&self, daemon: &Path) -> Option<bool>;

    /// Deliver a signal to the process group
    fn send_signal(&self, signal: Signal) -> Result<()>;

    /// Wait for the process to go away
    fn wait(&self, timeout: Duration) -> WaitOutcome;
}
