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
** Created on: 2026-06-15T10:03:12
** Author: Sylvain Fargier <fargier.sylvain@gmail.com>
*/

use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Debug, Clone, Copy, PartialEq, Subcommand)]
pub enum Action {
    /// Launch the configured daemon
    Start,
    /// Terminate the configured daemon
    Stop,
    /// Report whether the daemon is running
    Status,
    /// Stop then start the daemon (aliases: force-reload)
    #[clap(alias = "force-reload")]
    Restart,
}

#[derive(Debug, Parser)]
#[command(version, about, long_about = None)]
pub struct Args {
    #[command(subcommand)]
    pub action: Action,
    /// Configuration file location
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Result;
    use clap::error::ErrorKind;

    #[test]
    fn actions() -> Result<()> {
        assert_eq!(
            Args::try_parse_from(["svctl", "start"])?.action,
            Action::Start
        );
        assert_eq!(Args::try_parse_from(["svctl", "stop"])?.action, Action::Stop);
        assert_eq!(
            Args::try_parse_from(["svctl", "status"])?.action,
            Action::Status
        );
        assert_eq!(
            Args::try_parse_from(["svctl", "restart"])?.action,
            Action::Restart
        );
        assert_eq!(
            Args::try_parse_from(["svctl", "force-reload"])?.action,
            Action::Restart
        );
        Ok(())
    }

    #[test]
    fn config_flag() -> Result<()> {
        let args = Args::try_parse_from(["svctl", "--config", "/tmp/w.yml", "status"])?;
        assert_eq!(args.config, Some(PathBuf::from("/tmp/w.yml")));

        // global, also accepted after the subcommand
        let args = Args::try_parse_from(["svctl", "status", "-c", "w.yml"])?;
        assert_eq!(args.config, Some(PathBuf::from("w.yml")));
        Ok(())
    }

    #[test]
    fn usage_errors() {
        // a bare invocation reports help-on-missing, mapped to the same
        // usage exit as any other parse error
        assert_eq!(
            Args::try_parse_from(["svctl"]).unwrap_err().kind(),
            ErrorKind::DisplayHelpOnMissingArgumentOrSubcommand
        );
        assert_eq!(
            Args::try_parse_from(["svctl", "reload"]).unwrap_err().kind(),
            ErrorKind::InvalidSubcommand
        );
    }
}
