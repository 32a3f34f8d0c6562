// Copyright (c) 2024-2026 Martin Schröder <info@swedishembedded.com>
//
// SPDX-License-Identifier: MIT
use atelier_types::{Path, PendingStroke};

use crate::interpolate::interpolate;

/// Build the pending-queue entries for one drawn batch.
///
/// Every entry shares `batch_id`; intra-batch order follows the input order.
/// Returns the entries and the total interpolated point count, which sizes
/// the orchestrator's draw-gate wait.
pub fn build_batch(
    paths: &[Path],
    batch_id: u64,
    steps_per_unit: f64,
) -> (Vec<PendingStroke>, usize) {
    let mut entries = Vec::with_capacity(paths.len());
    let mut total_points = 0;

    for path in paths {
        let points = interpolate(path, steps_per_unit);
        total_points += points.len();
        entries.push(PendingStroke {
            batch_id,
            path: path.clone(),
            points,
        });
    }

    (entries, total_points)
}

// ─── Unit tests ──────────────────────────────────────────────────────────────
