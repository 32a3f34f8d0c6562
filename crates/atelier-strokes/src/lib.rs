// Copyright (c) 2024-2026 Martin Schröder <info@swedishembedded.com>
//
// SPDX-License-Identifier: Apache-2.0
//! The stroke pipeline: tool-call path payloads in, animation-ready stroke
//! batches out.
//!
//! Everything in this crate is pure and synchronous:
//!
//! ```text
//! JSON path objects
//!   → validate_and_clamp   (reject malformed, clamp style + coordinates)
//!   → expand               (paint mode: brush → main stroke + bristles)
//!   → interpolate          (points the client animates, density-controlled)
//!   → build_batch          (pending entries sharing one batch id)
//! ```
//!
//! Brush expansion uses a random field seeded from the path content, so the
//! same path always expands to the same bristle geometry.

pub mod batch;
pub mod brush;
pub mod error;
pub mod interpolate;
pub mod svg;
pub mod validate;

pub use batch::build_batch;
pub use brush::expand;
pub use error::PathError;
pub use interpolate::interpolate;
pub use svg::{parse_svg_path, transform_svg_path, SvgSegment};
pub use validate::validate_and_clamp;
