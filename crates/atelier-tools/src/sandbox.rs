// Copyright (c) 2024-2026 Martin Schröder <info@swedishembedded.com>
//
// SPDX-License-Identifier: Apache-2.0
//! Python sub-interpreter for algorithmic path generation.
//!
//! The agent's code runs in a separate process with a fixed helper surface
//! prepended: canvas dimensions, the brush list, path constructors, and
//! `output_paths` / `output_svg_paths` emitters that print JSON to stdout.
//! The process is killed when the wall-clock timeout expires.

use std::io::Write;
use std::process::Stdio;

use serde_json::Value;
use tokio::process::Command;
use tracing::debug;

use atelier_types::brush_names;

use crate::context::SandboxSettings;

/// Outcome of one sandbox run.
#[derive(Debug, Clone)]
pub struct SandboxResult {
    pub stdout: String,
    pub stderr: String,
    pub exit_code: i32,
    /// Raw path objects collected from the emitted JSON.  Validation happens
    /// in the calling tool.
    pub paths: Vec<Value>,
}

/// Execute agent-written Python and collect emitted paths.
pub async fn run_python(
    code: &str,
    canvas_width: u32,
    canvas_height: u32,
    settings: &SandboxSettings,
) -> SandboxResult {
    let full_code = build_program(code, canvas_width, canvas_height);

    // The interpreter reads from a real file so tracebacks carry line
    // numbers.  NamedTempFile unlinks it when dropped.
    let mut script = match tempfile::NamedTempFile::new() {
        Ok(f) => f,
        Err(e) => return failure(format!("failed to create sandbox script: {e}")),
    };
    if let Err(e) = script.write_all(full_code.as_bytes()) {
        return failure(format!("failed to write sandbox script: {e}"));
    }

    let mut cmd = Command::new(&settings.python_bin);
    cmd.arg(script.path())
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        // When the timeout fires and the future is dropped, tokio sends
        // SIGKILL before releasing the process handle.
        .kill_on_drop(true);

    debug!(timeout = ?settings.timeout, "running sandbox");
    let output = match tokio::time::timeout(settings.timeout, cmd.output()).await {
        Ok(Ok(output)) => output,
        Ok(Err(e)) => return failure(format!("failed to start {}: {e}", settings.python_bin)),
        Err(_) => {
            return failure(format!(
                "Execution timed out after {}s",
                settings.timeout.as_secs()
            ))
        }
    };

    let stdout = String::from_utf8_lossy(&output.stdout).to_string();
    let stderr = String::from_utf8_lossy(&output.stderr).to_string();
    let exit_code = output.status.code().unwrap_or(-1);

    let paths = if exit_code == 0 {
        collect_paths(&stdout)
    } else {
        Vec::new()
    };

    SandboxResult {
        stdout,
        stderr,
        exit_code,
        paths,
    }
}

fn failure(message: String) -> SandboxResult {
    SandboxResult {
        stdout: String::new(),
        stderr: message,
        exit_code: -1,
        paths: Vec::new(),
    }
}

/// Scan stdout for `{"paths": [...]}` / `{"svg_paths": [...]}` lines.
/// SVG d-strings are wrapped into path objects for uniform validation.
fn collect_paths(stdout: &str) -> Vec<Value> {
    let mut paths = Vec::new();
    for line in stdout.lines() {
        let Ok(value) = serde_json::from_str::<Value>(line.trim()) else {
            continue;
        };
        if let Some(items) = value.get("paths").and_then(Value::as_array) {
            paths.extend(items.iter().cloned());
        }
        if let Some(items) = value.get("svg_paths").and_then(Value::as_array) {
            for d in items.iter().filter_map(Value::as_str) {
                paths.push(serde_json::json!({"type": "svg", "d": d}));
            }
        }
    }
    paths
}

/// Prepend the fixed helper surface to the agent's code.
fn build_program(code: &str, canvas_width: u32, canvas_height: u32) -> String {
    let brushes =
        serde_json::to_string(&brush_names()).expect("brush names serialize");
    format!(
        r#"
import math
import random
import json

# Canvas dimensions
canvas_width = {canvas_width}
canvas_height = {canvas_height}

# Available brush presets for paint mode
BRUSHES = {brushes}

def _add_style(path_dict, brush=None, color=None, stroke_width=None, opacity=None):
    if brush is not None:
        path_dict["brush"] = brush
    if color is not None:
        path_dict["color"] = color
    if stroke_width is not None:
        path_dict["stroke_width"] = stroke_width
    if opacity is not None:
        path_dict["opacity"] = opacity
    return path_dict

def svg_path(d, brush=None, color=None, stroke_width=None, opacity=None):
    return _add_style({{"type": "svg", "d": d}}, brush, color, stroke_width, opacity)

def line(x1, y1, x2, y2, brush=None, color=None, stroke_width=None, opacity=None):
    return _add_style(
        {{"type": "line", "points": [{{"x": x1, "y": y1}}, {{"x": x2, "y": y2}}]}},
        brush, color, stroke_width, opacity
    )

def polyline(*points, brush=None, color=None, stroke_width=None, opacity=None):
    return _add_style(
        {{"type": "polyline", "points": [{{"x": p[0], "y": p[1]}} for p in points]}},
        brush, color, stroke_width, opacity
    )

def quadratic(x1, y1, cx, cy, x2, y2, brush=None, color=None, stroke_width=None, opacity=None):
    return _add_style(
        {{"type": "quadratic", "points": [
            {{"x": x1, "y": y1}}, {{"x": cx, "y": cy}}, {{"x": x2, "y": y2}}
        ]}},
        brush, color, stroke_width, opacity
    )

def cubic(x1, y1, cx1, cy1, cx2, cy2, x2, y2, brush=None, color=None, stroke_width=None, opacity=None):
    return _add_style(
        {{"type": "cubic", "points": [
            {{"x": x1, "y": y1}}, {{"x": cx1, "y": cy1}}, {{"x": cx2, "y": cy2}}, {{"x": x2, "y": y2}}
        ]}},
        brush, color, stroke_width, opacity
    )

def output_paths(paths):
    print(json.dumps({{"paths": paths}}))

def output_svg_paths(svg_d_strings):
    print(json.dumps({{"svg_paths": svg_d_strings}}))

# User code below
{code}
"#
    )
}

// ─── Unit tests ──────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn collect_paths_reads_path_objects() {
        let stdout = r#"{"paths": [{"type": "line", "points": []}]}"#;
        let paths = collect_paths(stdout);
        assert_eq!(paths.len(), 1);
        assert_eq!(paths[0]["type"], "line");
    }

    #[test]
    fn collect_paths_wraps_svg_strings() {
        let stdout = r#"{"svg_paths": ["M 0 0 L 1 1", "M 2 2 L 3 3"]}"#;
        let paths = collect_paths(stdout);
        assert_eq!(paths.len(), 2);
        assert_eq!(paths[0]["type"], "svg");
        assert_eq!(paths[0]["d"], "M 0 0 L 1 1");
    }

    #[test]
    fn collect_paths_ignores_non_json_noise() {
        let stdout = "warming up\n{\"paths\": []}\ndone";
        assert!(collect_paths(stdout).is_empty());
    }

    #[test]
    fn program_embeds_canvas_dimensions_and_brushes() {
        let program = build_program("output_paths([])", 1024, 768);
        assert!(program.contains("canvas_width = 1024"));
        assert!(program.contains("canvas_height = 768"));
        assert!(program.contains("oil_round"));
        assert!(program.ends_with("output_paths([])\n"));
    }
}
