// Copyright (c) 2024-2026 Martin Schröder <info@swedishembedded.com>
//
// SPDX-License-Identifier: MIT
use thiserror::Error;

/// Rejection reasons for client- or agent-supplied path payloads.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PathError {
    #[error("path must be an object")]
    NotAnObject,

    #[error("unknown path type: {0}")]
    UnknownKind(String),

    #[error("{kind} path needs at least {need} points, got {got}")]
    TooFewPoints {
        kind: &'static str,
        need: usize,
        got: usize,
    },

    #[error("point {index} is not a finite coordinate pair")]
    BadPoint { index: usize },

    #[error("malformed svg path: {0}")]
    MalformedSvg(String),
}
