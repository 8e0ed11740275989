// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 buildflow contributors

//! Command registry
//!
//! Describes the commands this package exposes to a host command bus.

use serde::Serialize;

/// One parameter of an exposed command
#[derive(Debug, Clone, Serialize)]
pub struct ParamInfo {
    pub name: &'static str,
    pub desc: &'static str,
    pub required: bool,
}

/// An exposed command
#[derive(Debug, Clone, Serialize)]
pub struct CommandInfo {
    pub name: &'static str,
    pub desc: &'static str,
    pub params: Vec<ParamInfo>,
}

/// All commands this package registers
pub fn registry() -> Vec<CommandInfo> {
    vec![CommandInfo {
        name: "build",
        desc: "fetch, patch, configure and install the package",
        params: vec![
            ParamInfo {
                name: "config",
                desc: "configuration file",
                required: false,
            },
            ParamInfo {
                name: "jobs",
                desc: "parallel jobs for the build tool",
                required: false,
            },
            ParamInfo {
                name: "strategy",
                desc: "auto, bootstrap or configure",
                required: false,
            },
            ParamInfo {
                name: "temp-root",
                desc: "download and extraction directory",
                required: false,
            },
        ],
    }]
}

/// Look up a command by name
pub fn find(name: &str) -> Option<CommandInfo> {
    registry().into_iter().find(|c| c.name == name)
}
