// Copyright (c) 2024-2026 Martin Schröder <info@swedishembedded.com>
//
// SPDX-License-Identifier: Apache-2.0
use thiserror::Error;

#[derive(Debug, Error)]
pub enum RenderError {
    #[error("canvas has zero area ({width}x{height})")]
    EmptyCanvas { width: u32, height: u32 },

    #[error("png encoding failed: {0}")]
    Encode(#[from] image::ImageError),
}
