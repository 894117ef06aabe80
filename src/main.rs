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
** Created on: 2026-06-15T09:12:40
** Author: Sylvain Fargier <fargier.sylvain@gmail.com>
*/

use anyhow::Result;
use clap::{Parser, error::ErrorKind};
use std::process::ExitCode;
use tracing_subscriber::{EnvFilter, Registry, fmt, layer::SubscriberExt, util::SubscriberInitExt};

pub mod cmdline;
pub mod config;
pub mod controller;
pub mod pidfile;
pub mod process;
pub mod utils;

use cmdline::{Action, Args};
use config::Config;
use controller::{Controller, Outcome};

/// start/stop/restart failed to change state
const EXIT_FAILURE: u8 = 2;
/// the command line could not be understood
const EXIT_USAGE: u8 = 3;
/// status cannot be determined
const EXIT_UNKNOWN: u8 = 4;

fn main() -> ExitCode {
    Registry::default()
        .with(EnvFilter::from_default_env())
        .with(fmt::layer().with_writer(std::io::stderr))
        .init();

    let args = match Args::try_parse() {
        Ok(args) => args,
        Err(err) => {
            let code = match err.kind() {
                ErrorKind::DisplayHelp | ErrorKind::DisplayVersion => 0,
                _ => EXIT_USAGE,
            };
            let _ = err.print();
            return ExitCode::from(code);
        }
    };

    let config = match Config::locate(args.config)
        .ok_or_else(|| anyhow::anyhow!("no configuration file found"))
        .and_then(|path| Config::load(&path))
    {
        Ok(config) => config,
        Err(err) => {
            eprintln!("svctl: {err:#}");
            return ExitCode::from(match args.action {
                Action::Status => EXIT_UNKNOWN,
                _ => EXIT_FAILURE,
            });
        }
    };

    let controller = Controller::new(config);
    match args.action {
        Action::Status => {
            let state = controller.status();
            println!("{}: {}", controller.name(), state);
            ExitCode::from(state.exit_code())
        }
        action => match run(&controller, action) {
            Ok(outcome) => ExitCode::from(outcome.exit_code()),
            Err(err) => {
                eprintln!("svctl: {err:#}");
                ExitCode::from(EXIT_FAILURE)
            }
        },
    }
}

fn run(controller: &Controller, action: Action) -> Result<Outcome> {
    let outcome = match action {
        Action::Start => controller.start()?,
        Action::Stop => controller.stop()?,
        Action::Restart => controller.restart()?,
        Action::Status => unreachable!("handled by the caller"),
    };
    match (action, outcome) {
        (Action::Start, Outcome::Done) => println!("{} started", controller.name()),
        (Action::Start, Outcome::Unchanged) => println!("{} already running", controller.name()),
        (Action::Stop, Outcome::Done) => println!("{} stopped", controller.name()),
        (Action::Stop, Outcome::Unchanged) => println!("{} not running", controller.name()),
        (Action::Restart, _) => println!("{} restarted", controller.name()),
        _ => {}
    }
    Ok(outcome)
}
