/*
 * This file is part of pifan.
 *
 * Copyright (C) 2025 pifan contributors
 *
 * pifan is free software: you can redistribute it and/or modify
 * it under the terms of the GNU General Public License as published by
 * the Free Software Foundation, either version 3 of the License, or
 * (at your option) any later version.
 *
 * pifan is distributed in the hope that it will be useful,
 * but WITHOUT ANY WARRANTY; without even the implied warranty of
 * MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE. See the
 * GNU General Public License for more details.
 *
 * You should have received a copy of the GNU General Public License
 * along with pifan. If not, see <https://www.gnu.org/licenses/>.
 */

use std::io::IsTerminal;
use std::path::Path;

use tracing_subscriber::EnvFilter;

use crate::constants::paths;

/// Environment variable holding the log filter (default `info`)
pub const LOG_ENV: &str = "PIFAN_LOG";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogTarget {
    Journald,
    Stdout,
}

/// Journald when running under systemd without a terminal, stdout otherwise.
pub fn choose_target(journal_socket: &Path, interactive: bool) -> LogTarget {
    if journal_socket.exists() && !interactive {
        LogTarget::Journald
    } else {
        LogTarget::Stdout
    }
}

fn log_level() -> String {
    std::env::var(LOG_ENV).unwrap_or_else(|_| "info".to_string())
}

/// Install the global subscriber. Returns where records are going.
pub fn init_logging() -> LogTarget {
    let level = log_level();
    let interactive = std::io::stderr().is_terminal();

    match choose_target(Path::new(paths::JOURNALD_SOCKET), interactive) {
        LogTarget::Journald => match tracing_journald::layer() {
            Ok(journald_layer) => {
                use tracing_subscriber::prelude::*;
                tracing_subscriber::registry()
                    .with(journald_layer)
                    .with(EnvFilter::new(&level))
                    .init();
                LogTarget::Journald
            }
            Err(e) => {
                eprintln!("Failed to create journald layer: {}, falling back to stdout", e);
                init_stdout(&level);
                LogTarget::Stdout
            }
        },
        LogTarget::Stdout => {
            init_stdout(&level);
            LogTarget::Stdout
        }
    }
}

fn init_stdout(level: &str) {
    tracing_subscriber::fmt()
        .with_target(false)
        .with_level(true)
        .with_env_filter(EnvFilter::new(level))
        .init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_interactive_always_stdout() {
        let dir = tempfile::tempdir().unwrap();
        let socket = dir.path().join("socket");
        std::fs::write(&socket, "").unwrap();
        assert_eq!(choose_target(&socket, true), LogTarget::Stdout);
        assert_eq!(choose_target(&socket, false), LogTarget::Journald);
    }

    #[test]
    fn test_no_journal_socket() {
        let dir = tempfile::tempdir().unwrap();
        assert_eq!(choose_target(&dir.path().join("socket"), false), LogTarget::Stdout);
    }
}
