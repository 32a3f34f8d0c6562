// Copyright (c) 2024-2026 Martin Schröder <info@swedishembedded.com>
//
// SPDX-License-Identifier: Apache-2.0
//! Agent session abstraction — the seam that hides the LLM transport.
//!
//! The orchestrator talks to [`AgentSession`] only: connect with options,
//! send a multimodal turn prompt, consume a typed event stream, disconnect.
//! Tool dispatch runs inside the session against the registered
//! [`atelier_tools::ToolRegistry`], so drawing tools reach the
//! orchestrator's draw-gate through the tool context, never through a back
//! reference.
//!
//! [`ScriptedSession`] replays pre-programmed event scripts (executing real
//! tool handlers for scripted calls) so the orchestrator can be tested
//! without network access.

pub mod event;
pub mod prompts;
pub mod scripted;
pub mod session;

pub use event::SessionEvent;
pub use prompts::system_prompt;
pub use scripted::{ScriptStep, ScriptedSession};
pub use session::{AgentSession, EventStream, SessionOptions, TurnPrompt};
