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

//! Collector service: wires settings, bus, store and clock into the loop

use std::sync::atomic::AtomicBool;

use anyhow::{Context, Result};
use tracing::{info, warn};

use tl_core::{Clock, JsonSnapshotFeed, ReadingStore, SamplingLoop, Settings, SysfsBus};
use tl_error::ThermologError;

/// Open the store and discover the bus. The store is compacted on the way.
pub fn build_sampler<C>(settings: &Settings, clock: C) -> Result<SamplingLoop<SysfsBus, ReadingStore, C>>
where
    C: Clock + Clone + 'static,
{
    settings.validate().context("invalid configuration")?;

    let store_path = &settings.storage.store_path;
    let mut store = ReadingStore::open(store_path)
        .with_context(|| format!("failed to open reading store {}", store_path.display()))?;
    if let Err(e) = store.compact() {
        warn!("Could not compact {}: {}", store_path.display(), e);
    }

    let devices_path = &settings.bus.devices_path;
    let bus = SysfsBus::new(devices_path);
    let sampler = SamplingLoop::new(
        bus,
        store,
        clock.clone(),
        settings.loop_settings(),
        settings.sensor_defaults(),
    )
    .map_err(|e| {
        let nothing_found = matches!(e, ThermologError::NoSupportedDevices);
        let err = anyhow::Error::new(e);
        if nothing_found {
            err.context(format!("nothing to sample under {}", devices_path.display()))
        } else {
            err
        }
    })?;

    let sampler = match &settings.storage.snapshot_path {
        Some(path) => {
            info!("Writing today's means to {}", path.display());
            let feed = JsonSnapshotFeed::new(path, clock).with_store(store_path);
            sampler.with_snapshot_feed(Box::new(feed))
        }
        None => sampler,
    };

    Ok(sampler)
}

/// Run the collector until `shutdown` is set
pub fn run_service<C>(settings: &Settings, clock: C, shutdown: &AtomicBool) -> Result<()>
where
    C: Clock + Clone + 'static,
{
    let mut sampler = build_sampler(settings, clock)?;
    for sensor in sampler.topology().sensors() {
        info!(device = %sensor.device_id(), model = %sensor.kind(), "Found sensor");
    }
    sampler.run(shutdown).context("sampling loop failed")
}
