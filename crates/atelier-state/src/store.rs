// Copyright (c) 2024-2026 Martin Schröder <info@swedishembedded.com>
//
// SPDX-License-Identifier: Apache-2.0
use std::path::{Path as FsPath, PathBuf};
use std::sync::OnceLock;
use std::time::Duration;

use regex::Regex;
use std::sync::Arc;
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use atelier_strokes::build_batch;
use atelier_types::{
    piece_id, AgentStatus, CanvasState, DrawingStyle, GalleryEntry, Path, PauseReason,
    PendingStroke, SavedPiece,
};

use crate::error::StateError;
use crate::persist::WorkspaceDocument;

/// Tunables injected from configuration.
#[derive(Debug, Clone)]
pub struct StoreOptions {
    pub max_workspace_bytes: usize,
    pub max_pending_strokes: usize,
    pub steps_per_unit: f64,
    pub save_debounce: Duration,
    pub canvas_width: u32,
    pub canvas_height: u32,
}

impl Default for StoreOptions {
    fn default() -> Self {
        Self {
            max_workspace_bytes: 5 * 1024 * 1024,
            max_pending_strokes: 1000,
            steps_per_unit: 0.5,
            save_debounce: Duration::from_millis(500),
            canvas_width: 800,
            canvas_height: 600,
        }
    }
}

/// Mutable workspace state, guarded by the strokes lock.
#[derive(Debug, Clone)]
struct WorkspaceData {
    canvas: CanvasState,
    status: AgentStatus,
    pause_reason: PauseReason,
    piece_number: u32,
    notes: String,
    monologue: String,
    current_piece_title: Option<String>,
    pending_strokes: Vec<PendingStroke>,
    stroke_batch_id: u64,
}

/// A cheap read-only copy of the workspace for init payloads and REST routes.
#[derive(Debug, Clone)]
pub struct WorkspaceSnapshot {
    pub canvas: CanvasState,
    pub status: AgentStatus,
    pub pause_reason: PauseReason,
    pub piece_number: u32,
    pub notes: String,
    pub monologue: String,
    pub current_piece_title: Option<String>,
    pub pending_count: usize,
    pub stroke_batch_id: u64,
}

#[derive(Default)]
struct DebounceState {
    pending: bool,
    task: Option<JoinHandle<()>>,
}

/// Per-user workspace state backed by the filesystem.
pub struct WorkspaceStore {
    user_id: String,
    user_dir: PathBuf,
    workspace_file: PathBuf,
    gallery_dir: PathBuf,
    gallery_index_file: PathBuf,
    opts: StoreOptions,
    /// Strokes lock: canvas mutations and the pending queue.
    data: Mutex<WorkspaceData>,
    /// Write lock: persistence I/O.  Never taken while holding `data`.
    write_lock: Mutex<()>,
    /// Gallery index cache, loaded on demand.
    gallery_index: Mutex<Option<Vec<GalleryEntry>>>,
    save_state: Mutex<DebounceState>,
}

fn uuid_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?i)^[0-9a-f]{8}-[0-9a-f]{4}-[0-9a-f]{4}-[0-9a-f]{4}-[0-9a-f]{12}$")
            .expect("uuid regex compiles")
    })
}

impl WorkspaceStore {
    /// Load or create workspace state for a user.
    ///
    /// The user id must be a UUID and the resolved directory must stay
    /// within `root` (path traversal protection).  A corrupt
    /// `workspace.json` is renamed with a `.corrupted` suffix and fresh
    /// state is used.
    pub async fn load_for_user(
        user_id: &str,
        root: &FsPath,
        opts: StoreOptions,
    ) -> Result<Arc<Self>, StateError> {
        if !uuid_regex().is_match(user_id) {
            return Err(StateError::InvalidUserId(user_id.to_string()));
        }

        tokio::fs::create_dir_all(root).await?;
        let root = tokio::fs::canonicalize(root).await?;
        let user_dir = root.join(user_id);
        tokio::fs::create_dir_all(&user_dir).await?;
        let user_dir = tokio::fs::canonicalize(&user_dir).await?;
        if !user_dir.starts_with(&root) {
            return Err(StateError::OutsideRoot(user_id.to_string()));
        }

        let gallery_dir = user_dir.join("gallery");
        tokio::fs::create_dir_all(&gallery_dir).await?;
        tokio::fs::create_dir_all(user_dir.join("references")).await?;

        let store = Self {
            user_id: user_id.to_string(),
            workspace_file: user_dir.join("workspace.json"),
            gallery_index_file: gallery_dir.join("_index.json"),
            gallery_dir,
            user_dir,
            opts,
            data: Mutex::new(WorkspaceData {
                canvas: CanvasState::default(),
                status: AgentStatus::Paused,
                pause_reason: PauseReason::None,
                piece_number: 1,
                notes: String::new(),
                monologue: String::new(),
                current_piece_title: None,
                pending_strokes: Vec::new(),
                stroke_batch_id: 0,
            }),
            write_lock: Mutex::new(()),
            gallery_index: Mutex::new(None),
            save_state: Mutex::new(DebounceState::default()),
        };
        store.load_from_file().await?;
        Ok(Arc::new(store))
    }

    async fn load_from_file(&self) -> Result<(), StateError> {
        let text = match tokio::fs::read_to_string(&self.workspace_file).await {
            Ok(text) => text,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                info!(user = %self.user_id, "new workspace created");
                let mut data = self.data.lock().await;
                data.canvas = CanvasState::with_size(self.opts.canvas_width, self.opts.canvas_height);
                return Ok(());
            }
            Err(e) => return Err(e.into()),
        };

        let doc: WorkspaceDocument = match serde_json::from_str(&text) {
            Ok(doc) => doc,
            Err(e) => {
                warn!(
                    user = %self.user_id,
                    "corrupted workspace.json ({e}), quarantining and starting fresh"
                );
                let backup = self.workspace_file.with_extension("json.corrupted");
                tokio::fs::rename(&self.workspace_file, &backup).await?;
                let mut data = self.data.lock().await;
                data.canvas = CanvasState::with_size(self.opts.canvas_width, self.opts.canvas_height);
                return Ok(());
            }
        };

        let mut data = self.data.lock().await;
        data.canvas = doc.canvas;
        data.status = doc.status;
        data.pause_reason = doc.pause_reason;
        data.piece_number = doc.piece_number;
        data.notes = doc.notes;
        data.monologue = doc.monologue;
        data.current_piece_title = doc.current_piece_title;
        data.pending_strokes = doc.pending_strokes;
        data.stroke_batch_id = doc.stroke_batch_id;

        info!(
            user = %self.user_id,
            piece = data.piece_number,
            strokes = data.canvas.strokes.len(),
            "workspace loaded"
        );
        Ok(())
    }

    pub fn user_id(&self) -> &str {
        &self.user_id
    }

    /// The user's workspace directory (scopes filesystem-facing tools).
    pub fn workspace_dir(&self) -> &FsPath {
        &self.user_dir
    }

    pub fn references_dir(&self) -> PathBuf {
        self.user_dir.join("references")
    }

    // ── Reads ─────────────────────────────────────────────────────────────────

    pub async fn snapshot(&self) -> WorkspaceSnapshot {
        let data = self.data.lock().await;
        WorkspaceSnapshot {
            canvas: data.canvas.clone(),
            status: data.status,
            pause_reason: data.pause_reason,
            piece_number: data.piece_number,
            notes: data.notes.clone(),
            monologue: data.monologue.clone(),
            current_piece_title: data.current_piece_title.clone(),
            pending_count: data.pending_strokes.len(),
            stroke_batch_id: data.stroke_batch_id,
        }
    }

    pub async fn status(&self) -> AgentStatus {
        self.data.lock().await.status
    }

    pub async fn pause_reason(&self) -> PauseReason {
        self.data.lock().await.pause_reason
    }

    pub async fn piece_number(&self) -> u32 {
        self.data.lock().await.piece_number
    }

    pub async fn drawing_style(&self) -> DrawingStyle {
        self.data.lock().await.canvas.drawing_style
    }

    pub async fn has_pending_strokes(&self) -> bool {
        !self.data.lock().await.pending_strokes.is_empty()
    }

    pub async fn stroke_batch_id(&self) -> u64 {
        self.data.lock().await.stroke_batch_id
    }

    // ── Metadata writes ───────────────────────────────────────────────────────

    pub async fn set_status(&self, status: AgentStatus) -> Result<(), StateError> {
        self.data.lock().await.status = status;
        self.save().await
    }

    pub async fn set_pause(
        &self,
        status: AgentStatus,
        reason: PauseReason,
    ) -> Result<(), StateError> {
        {
            let mut data = self.data.lock().await;
            data.status = status;
            data.pause_reason = reason;
        }
        self.save().await
    }

    pub async fn set_piece_number(&self, piece_number: u32) -> Result<(), StateError> {
        self.data.lock().await.piece_number = piece_number;
        self.save().await
    }

    pub async fn set_notes(&self, notes: String) -> Result<(), StateError> {
        self.data.lock().await.notes = notes;
        self.save().await
    }

    pub async fn set_monologue(&self, monologue: String) -> Result<(), StateError> {
        self.data.lock().await.monologue = monologue;
        self.save().await
    }

    /// Monologue update with a debounced save — used for streamed text
    /// deltas, where a full write per delta would thrash the disk.
    pub async fn set_monologue_debounced(self: &Arc<Self>, monologue: String) {
        self.data.lock().await.monologue = monologue;
        self.save_debounced().await;
    }

    pub async fn set_piece_title(&self, title: String) -> Result<(), StateError> {
        self.data.lock().await.current_piece_title = Some(title);
        self.save().await
    }

    pub async fn set_style(&self, style: DrawingStyle) -> Result<(), StateError> {
        self.data.lock().await.canvas.drawing_style = style;
        self.save().await
    }

    // ── Canvas operations ─────────────────────────────────────────────────────

    /// Append one stroke to the canvas.
    pub async fn add_stroke(&self, path: Path) -> Result<(), StateError> {
        self.data.lock().await.canvas.strokes.push(path);
        self.save().await
    }

    /// Append several strokes under one lock acquisition and one save.
    pub async fn add_strokes(&self, paths: Vec<Path>) -> Result<(), StateError> {
        self.data.lock().await.canvas.strokes.extend(paths);
        self.save().await
    }

    pub async fn clear_canvas(&self) -> Result<(), StateError> {
        self.data.lock().await.canvas.strokes.clear();
        self.save().await
    }

    /// Drop queued-but-unfetched strokes (new canvas, mid-turn clear).
    pub async fn clear_pending(&self) -> Result<(), StateError> {
        self.data.lock().await.pending_strokes.clear();
        self.save().await
    }

    /// Replace the canvas strokes with a gallery piece's contents.
    pub async fn replace_strokes(&self, strokes: Vec<Path>) -> Result<(), StateError> {
        self.data.lock().await.canvas.strokes = strokes;
        self.save().await
    }

    // ── Pending-stroke queue ──────────────────────────────────────────────────

    /// Interpolate paths and queue them for client-side rendering.
    ///
    /// Assigns the next batch id (strictly monotonic per workspace) and
    /// enforces the pending cap by dropping the oldest entries, equal in
    /// count to the incoming batch, before appending.
    pub async fn queue_strokes(&self, paths: &[Path]) -> Result<(u64, usize), StateError> {
        let (batch_id, total_points) = {
            let mut data = self.data.lock().await;
            if data.pending_strokes.len() >= self.opts.max_pending_strokes {
                let drop_count = paths.len().min(data.pending_strokes.len());
                warn!(
                    user = %self.user_id,
                    limit = self.opts.max_pending_strokes,
                    dropped = drop_count,
                    "pending stroke limit reached, dropping oldest"
                );
                data.pending_strokes.drain(..drop_count);
            }

            data.stroke_batch_id += 1;
            let batch_id = data.stroke_batch_id;
            let (entries, total_points) = build_batch(paths, batch_id, self.opts.steps_per_unit);
            data.pending_strokes.extend(entries);
            (batch_id, total_points)
        };
        self.save().await?;
        Ok((batch_id, total_points))
    }

    /// Atomically take and clear the pending queue.  A second call returns
    /// an empty list.
    pub async fn pop_strokes(&self) -> Result<Vec<PendingStroke>, StateError> {
        let strokes = std::mem::take(&mut self.data.lock().await.pending_strokes);
        self.save().await?;
        Ok(strokes)
    }

    pub async fn pending_strokes(&self) -> Vec<PendingStroke> {
        self.data.lock().await.pending_strokes.clone()
    }

    // ── Gallery ───────────────────────────────────────────────────────────────

    /// Persist the current canvas to the gallery without clearing it.
    ///
    /// Returns the piece id, or `None` when the canvas is empty.  Gallery
    /// pieces are immutable: if the file for this piece number already
    /// exists it is left untouched and its id returned.
    pub async fn save_to_gallery(&self) -> Result<Option<String>, StateError> {
        let piece = {
            let data = self.data.lock().await;
            if data.canvas.strokes.is_empty() {
                return Ok(None);
            }
            SavedPiece {
                piece_number: data.piece_number,
                strokes: data.canvas.strokes.clone(),
                created_at: chrono::Utc::now().to_rfc3339(),
                drawing_style: data.canvas.drawing_style,
                title: data.current_piece_title.clone(),
            }
        };

        let saved_id = piece_id(piece.piece_number);
        let piece_file = self.gallery_dir.join(format!("{saved_id}.json"));
        let already_written = {
            let _guard = self.write_lock.lock().await;
            if tokio::fs::try_exists(&piece_file).await? {
                debug!(user = %self.user_id, id = %saved_id, "gallery piece already written");
                true
            } else {
                let bytes = serde_json::to_vec_pretty(&piece)?;
                atomic_write(&piece_file, &bytes).await?;
                info!(user = %self.user_id, id = %saved_id, "piece saved to gallery");
                false
            }
        };

        // The index mirrors the frozen files.  A skipped rewrite (the piece
        // number was not advanced since the last save) must not overwrite
        // the entry with metadata from the current canvas.
        if !already_written {
            let entry = GalleryEntry {
                id: saved_id.clone(),
                piece_number: piece.piece_number,
                stroke_count: piece.strokes.len(),
                created_at: piece.created_at.clone(),
                drawing_style: piece.drawing_style,
                title: piece.title.clone(),
            };
            self.update_gallery_index(entry).await?;
        }
        self.save().await?;

        Ok(Some(saved_id))
    }

    /// Save the current canvas (if non-empty) and start a fresh piece.
    ///
    /// Always advances `piece_number`; the gallery numbering gets a gap
    /// where the canvas was empty.  Clears notes, monologue, title and the
    /// pending queue before any batch can target the new piece.
    pub async fn new_canvas(&self) -> Result<Option<String>, StateError> {
        let saved_id = self.save_to_gallery().await?;

        {
            let mut data = self.data.lock().await;
            data.canvas.strokes.clear();
            data.piece_number += 1;
            data.monologue.clear();
            data.notes.clear();
            data.current_piece_title = None;
            data.pending_strokes.clear();
        }
        self.save().await?;
        Ok(saved_id)
    }

    /// Load strokes and drawing style from a gallery piece.
    pub async fn load_from_gallery(
        &self,
        piece_number: u32,
    ) -> Result<Option<(Vec<Path>, DrawingStyle)>, StateError> {
        // Older galleries used 3-digit file names.
        for name in [
            format!("piece_{piece_number:06}.json"),
            format!("piece_{piece_number:03}.json"),
        ] {
            let piece_file = self.gallery_dir.join(&name);
            let text = match tokio::fs::read_to_string(&piece_file).await {
                Ok(text) => text,
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => continue,
                Err(e) => return Err(e.into()),
            };
            match serde_json::from_str::<SavedPiece>(&text) {
                Ok(piece) => return Ok(Some((piece.strokes, piece.drawing_style))),
                Err(e) => {
                    warn!(user = %self.user_id, piece = piece_number, "failed to load gallery piece: {e}");
                    return Ok(None);
                }
            }
        }
        Ok(None)
    }

    /// Metadata-only gallery listing, served from the cached index.
    pub async fn list_gallery(&self) -> Result<Vec<GalleryEntry>, StateError> {
        let mut cache = self.gallery_index.lock().await;
        if cache.is_none() {
            *cache = Some(self.load_gallery_index().await?);
        }
        Ok(cache.clone().unwrap_or_default())
    }

    /// Gallery listing with full stroke data.  Loads every piece file —
    /// prefer [`list_gallery`] for listings.
    pub async fn list_gallery_with_strokes(&self) -> Result<Vec<SavedPiece>, StateError> {
        let mut pieces = Vec::new();
        let mut dir = match tokio::fs::read_dir(&self.gallery_dir).await {
            Ok(dir) => dir,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(pieces),
            Err(e) => return Err(e.into()),
        };
        while let Some(entry) = dir.next_entry().await? {
            let name = entry.file_name().to_string_lossy().to_string();
            if !name.starts_with("piece_") || !name.ends_with(".json") {
                continue;
            }
            let text = tokio::fs::read_to_string(entry.path()).await?;
            match serde_json::from_str::<SavedPiece>(&text) {
                Ok(piece) => pieces.push(piece),
                Err(e) => {
                    warn!(user = %self.user_id, file = %name, "skipping corrupted gallery file: {e}");
                }
            }
        }
        pieces.sort_by_key(|p| p.piece_number);
        Ok(pieces)
    }

    async fn update_gallery_index(&self, entry: GalleryEntry) -> Result<(), StateError> {
        let mut cache = self.gallery_index.lock().await;
        if cache.is_none() {
            *cache = Some(self.load_gallery_index().await?);
        }
        let index = cache.as_mut().expect("index loaded above");
        index.retain(|e| e.id != entry.id);
        index.push(entry);
        index.sort_by_key(|e| e.piece_number);

        let bytes = serde_json::to_vec_pretty(index)?;
        let _guard = self.write_lock.lock().await;
        atomic_write(&self.gallery_index_file, &bytes).await?;
        Ok(())
    }

    /// Read the gallery index, rebuilding it from piece files when missing
    /// or corrupt.
    async fn load_gallery_index(&self) -> Result<Vec<GalleryEntry>, StateError> {
        match tokio::fs::read_to_string(&self.gallery_index_file).await {
            Ok(text) => match serde_json::from_str::<Vec<GalleryEntry>>(&text) {
                Ok(index) => return Ok(index),
                Err(e) => {
                    warn!(user = %self.user_id, "gallery index unreadable ({e}), rebuilding");
                }
            },
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => return Err(e.into()),
        }

        let index: Vec<GalleryEntry> = self
            .list_gallery_with_strokes()
            .await?
            .into_iter()
            .map(|piece| GalleryEntry {
                id: piece_id(piece.piece_number),
                piece_number: piece.piece_number,
                stroke_count: piece.strokes.len(),
                created_at: piece.created_at,
                drawing_style: piece.drawing_style,
                title: piece.title,
            })
            .collect();

        let bytes = serde_json::to_vec_pretty(&index)?;
        let _guard = self.write_lock.lock().await;
        atomic_write(&self.gallery_index_file, &bytes).await?;
        Ok(index)
    }

    // ── Persistence ───────────────────────────────────────────────────────────

    /// Serialize the full state and write it atomically.
    ///
    /// When the serialized size exceeds the workspace cap, the oldest ten
    /// canvas strokes are trimmed and serialization retried until the
    /// document fits or only ten strokes remain.
    pub async fn save(&self) -> Result<(), StateError> {
        let bytes = {
            let mut data = self.data.lock().await;
            let mut bytes = serde_json::to_vec_pretty(&document_of(&data))?;
            if bytes.len() > self.opts.max_workspace_bytes {
                warn!(
                    user = %self.user_id,
                    size = bytes.len(),
                    limit = self.opts.max_workspace_bytes,
                    "workspace exceeds size limit, trimming old strokes"
                );
                while bytes.len() > self.opts.max_workspace_bytes && data.canvas.strokes.len() > 10
                {
                    data.canvas.strokes.drain(..10);
                    bytes = serde_json::to_vec_pretty(&document_of(&data))?;
                }
            }
            bytes
        };

        let _guard = self.write_lock.lock().await;
        atomic_write(&self.workspace_file, &bytes).await
    }

    /// Debounced save: coalesce rapid calls into one deferred write.
    pub async fn save_debounced(self: &Arc<Self>) {
        let mut state = self.save_state.lock().await;
        state.pending = true;
        let running = state.task.as_ref().map(|t| !t.is_finished()).unwrap_or(false);
        if running {
            return;
        }
        let store = Arc::clone(self);
        state.task = Some(tokio::spawn(async move {
            tokio::time::sleep(store.opts.save_debounce).await;
            let pending = {
                let mut state = store.save_state.lock().await;
                std::mem::take(&mut state.pending)
            };
            if pending {
                if let Err(e) = store.save().await {
                    warn!(user = %store.user_id, "debounced save failed: {e}");
                }
            }
        }));
    }
}

fn document_of(data: &WorkspaceData) -> WorkspaceDocument {
    WorkspaceDocument {
        canvas: data.canvas.clone(),
        status: data.status,
        pause_reason: data.pause_reason,
        piece_number: data.piece_number,
        notes: data.notes.clone(),
        monologue: data.monologue.clone(),
        current_piece_title: data.current_piece_title.clone(),
        pending_strokes: data.pending_strokes.clone(),
        stroke_batch_id: data.stroke_batch_id,
        updated_at: chrono::Utc::now().to_rfc3339(),
    }
}

/// Write bytes to a sibling temp file, fsync, then atomically rename.
async fn atomic_write(path: &FsPath, bytes: &[u8]) -> Result<(), StateError> {
    let tmp = path.with_extension("json.tmp");
    let mut file = tokio::fs::File::create(&tmp).await?;
    file.write_all(bytes).await?;
    file.sync_all().await?;
    drop(file);
    tokio::fs::rename(&tmp, path).await?;
    Ok(())
}

// ─── Unit tests ──────────────────────────────────────────────────────────────
