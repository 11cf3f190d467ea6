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

//! Thermolog - 1-Wire temperature collector
//!
//! Daemon-side pieces around `tl-core`: argument parsing, logging setup and
//! the service that runs the sampling loop.

pub mod cli;
pub mod logger;
pub mod service;
