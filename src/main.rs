/*
 * This file is part of Thermolog.
 *
 * Copyright (C) 2025 Thermolog contributors
 *
 * Thermolog is free software: you can redistribute it and/or modify
 * it under the terms of the GNU General Public License as published by
 * the Free Software Foundation, either version 3 of the License, or
 * (at your option) any later version.
 *
 * Thermolog is distributed in the hope that it will be useful,
 * but WITHOUT ANY WARRANTY; without even the implied warranty of
 * MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE. See the
 * GNU General Public License for more details.
 *
 * You should have received a copy of the GNU General Public License
 * along with Thermolog. If not, see <https://www.gnu.org/licenses/>.
 */

//! thermologd - samples the 1-Wire bus and records interval means

use std::sync::atomic::{AtomicBool, Ordering};

use anyhow::Context;
use tracing::{error, info};

use thermolog::cli::{self, Command};
use thermolog::{logger, service};
use tl_core::SystemClock;

/// Global shutdown flag, set from the signal handler
static SHUTDOWN: AtomicBool = AtomicBool::new(false);

fn main() -> anyhow::Result<()> {
    let config = match cli::parse_args(std::env::args().skip(1)) {
        Ok(Command::Help) => {
            cli::print_help();
            return Ok(());
        }
        Ok(Command::Version) => {
            cli::print_version();
            return Ok(());
        }
        Ok(Command::Run { config }) => config,
        Err(e) => {
            eprintln!("Error: {}", e);
            cli::print_help();
            std::process::exit(2);
        }
    };

    let target = logger::init_logging();
    info!("STARTUP: thermologd {} starting", cli::VERSION);
    info!("STARTUP: Logging to {}", target);

    let settings = tl_core::load_settings(config.as_deref()).context("failed to load settings")?;
    info!(
        "STARTUP: bus {}, store {}",
        settings.bus.devices_path.display(),
        settings.storage.store_path.display()
    );

    ctrlc::set_handler(|| {
        SHUTDOWN.store(true, Ordering::SeqCst);
    })
    .context("failed to install signal handler")?;

    if let Err(e) = service::run_service(&settings, SystemClock, &SHUTDOWN) {
        error!("{:#}", e);
        return Err(e);
    }

    info!("SHUTDOWN: thermologd stopped");
    Ok(())
}
