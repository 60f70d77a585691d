// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use std::io::IsTerminal;

const RESET: &str = "\x1b[0m";

/// Priority: `NO_COLOR=1` disables → `COLOR=1` forces → TTY check.
pub fn should_colorize() -> bool {
    if crate::env::no_color() {
        return false;
    }
    if crate::env::force_color() {
        return true;
    }
    std::io::stdout().is_terminal()
}

/// Colorize a build status string: green for succeeded/building, yellow
/// for idle/failed... matches the semantic palette used across the repo's
/// other status-reporting surfaces.
pub fn status(text: &str) -> String {
    if !should_colorize() {
        return text.to_string();
    }
    let code = match text.to_ascii_lowercase().as_str() {
        "succeeded" => "\x1b[32m",
        "building" => "\x1b[36m",
        "failed" => "\x1b[31m",
        "idle" => "\x1b[90m",
        _ => return text.to_string(),
    };
    format!("{code}{text}{RESET}")
}

#[cfg(test)]
#[path = "color_tests.rs"]
mod tests;
