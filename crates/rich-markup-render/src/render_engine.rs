use core::fmt;
use std::collections::VecDeque;
use std::fs::{self, File, OpenOptions};
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use log::{debug, trace};
use rich_markup::{
    layout_with_sink, CacheKey, Color, ConfigStack, FontHandle, MarkupDiagnostic, RenderConfig,
    Size,
};
use serde::{Deserialize, Serialize};

use crate::render_backend::{execute_commands, DrawBackend, FrameClock};
use crate::render_ir::{CommandList, Point, Rect};

/// Structured render-time diagnostics.
#[derive(Clone, Debug, PartialEq)]
pub enum RenderDiagnostic {
    /// Problem found while parsing the markup.
    Markup(MarkupDiagnostic),
    CacheHit {
        key: CacheKey,
        command_count: usize,
    },
    CacheMiss {
        key: CacheKey,
    },
    /// Render call with an empty target area; nothing was laid out.
    SkippedEmptyBounds,
}

type DiagnosticCallback = Arc<Mutex<Box<dyn FnMut(RenderDiagnostic) + Send + 'static>>>;
type DiagnosticSink = Option<DiagnosticCallback>;

/// Storage hooks for laid-out command lists.
pub trait RenderCacheStore {
    /// Load cached commands for `key`, if available.
    fn load_commands(&self, _key: &CacheKey) -> Option<CommandList> {
        None
    }

    /// Persist commands for `key`.
    fn store_commands(&self, _key: &CacheKey, _commands: &CommandList) {}
}

const DEFAULT_MEMORY_CACHE_ENTRIES: usize = 32;

/// Bounded in-memory cache with least-recently-used eviction.
#[derive(Debug)]
pub struct MemoryRenderCache {
    capacity: usize,
    entries: Mutex<VecDeque<(CacheKey, CommandList)>>,
}

impl Default for MemoryRenderCache {
    fn default() -> Self {
        Self::new(DEFAULT_MEMORY_CACHE_ENTRIES)
    }
}

impl MemoryRenderCache {
    /// Cache holding at most `capacity` entries (at least one).
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            capacity,
            entries: Mutex::new(VecDeque::with_capacity(capacity)),
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn len(&self) -> usize {
        self.entries.lock().map_or(0, |entries| entries.len())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn clear(&self) {
        if let Ok(mut entries) = self.entries.lock() {
            entries.clear();
        }
    }
}

impl RenderCacheStore for MemoryRenderCache {
    fn load_commands(&self, key: &CacheKey) -> Option<CommandList> {
        let mut entries = self.entries.lock().ok()?;
        let idx = entries.iter().position(|(k, _)| k == key)?;
        let entry = entries.remove(idx)?;
        let commands = entry.1.clone();
        entries.push_back(entry);
        Some(commands)
    }

    fn store_commands(&self, key: &CacheKey, commands: &CommandList) {
        let Ok(mut entries) = self.entries.lock() else {
            return;
        };
        entries.retain(|(k, _)| k != key);
        while entries.len() >= self.capacity {
            entries.pop_front();
        }
        entries.push_back((*key, commands.clone()));
    }
}

const CACHE_SCHEMA_VERSION: u8 = 1;
const DEFAULT_MAX_CACHE_FILE_BYTES: usize = 4 * 1024 * 1024;
const DEFAULT_CACHE_NAMESPACE: &str = "default";
static CACHE_WRITE_NONCE: AtomicUsize = AtomicUsize::new(0);

/// File-backed command cache store.
///
/// Cache paths are deterministic by namespace and key:
/// `<root>/<namespace>/<key>.json`. Configuration versions restart with
/// every process, so hosts persisting across runs should give each distinct
/// configuration its own namespace.
///
/// The store uses a JSON envelope with a schema version and enforces
/// `max_file_bytes` on both reads and writes. Failed reads and writes are
/// logged at debug level and behave as a cache miss.
#[derive(Clone, Debug)]
pub struct FileRenderCacheStore {
    root: PathBuf,
    namespace: String,
    max_file_bytes: usize,
}

impl FileRenderCacheStore {
    /// Create a new cache store rooted at `root`.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            namespace: DEFAULT_CACHE_NAMESPACE.to_string(),
            max_file_bytes: DEFAULT_MAX_CACHE_FILE_BYTES,
        }
    }

    /// Set the maximum allowed cache file size in bytes.
    ///
    /// Values of `0` are treated as `1` to keep the cap explicit.
    pub fn with_max_file_bytes(mut self, max_file_bytes: usize) -> Self {
        self.max_file_bytes = max_file_bytes.max(1);
        self
    }

    /// Subdirectory for this configuration. Path separators are replaced.
    pub fn with_namespace(mut self, namespace: &str) -> Self {
        let cleaned: String = namespace
            .chars()
            .map(|c| {
                if c.is_ascii_alphanumeric() || c == '-' || c == '_' {
                    c
                } else {
                    '_'
                }
            })
            .collect();
        self.namespace = if cleaned.is_empty() {
            DEFAULT_CACHE_NAMESPACE.to_string()
        } else {
            cleaned
        };
        self
    }

    /// Root directory for cache files.
    pub fn cache_root(&self) -> &Path {
        &self.root
    }

    /// Maximum allowed cache file size in bytes.
    pub fn max_file_bytes(&self) -> usize {
        self.max_file_bytes
    }

    /// Deterministic cache path for `key`.
    pub fn cache_path(&self, key: &CacheKey) -> PathBuf {
        self.root
            .join(&self.namespace)
            .join(format!("{}.json", key)) // allow: file I/O path, not hot
    }

    fn read_entry(&self, key: &CacheKey) -> io::Result<Option<CommandList>> {
        let path = self.cache_path(key);
        let limit = self.max_file_bytes as u64;
        if fs::metadata(&path)?.len() > limit {
            return Ok(None);
        }
        let mut payload = Vec::new();
        File::open(&path)?
            .take(limit.saturating_add(1))
            .read_to_end(&mut payload)?;
        if payload.len() > self.max_file_bytes {
            return Ok(None);
        }
        let stored: StoredCommands = serde_json::from_slice(&payload)?;
        Ok(stored.matching(key))
    }

    /// Serialize in memory, then publish through a synced temp file and a
    /// rename so readers never see a partial entry.
    fn write_entry(&self, key: &CacheKey, commands: &CommandList) -> io::Result<()> {
        let payload = serde_json::to_vec(&StoredCommandsRef {
            version: CACHE_SCHEMA_VERSION,
            key: key.to_string(),
            commands,
        })?;
        if payload.len() > self.max_file_bytes {
            return Err(io::Error::new(
                io::ErrorKind::InvalidData,
                "serialized commands exceed max_file_bytes",
            ));
        }

        let final_path = self.cache_path(key);
        let dir = final_path
            .parent()
            .ok_or_else(|| io::Error::new(io::ErrorKind::NotFound, "cache path has no directory"))?;
        fs::create_dir_all(dir)?;
        let nonce = CACHE_WRITE_NONCE.fetch_add(1, Ordering::Relaxed);
        let temp_path = final_path.with_extension(format!(
            // allow: file I/O path, not hot
            "json.tmp-{}-{}",
            std::process::id(),
            nonce
        ));
        let published = write_synced(&temp_path, &payload)
            .and_then(|()| fs::rename(&temp_path, &final_path));
        if published.is_err() {
            let _ = fs::remove_file(&temp_path);
        }
        published?;
        // Not every platform can open a directory; the entry is in place either way.
        if let Ok(handle) = File::open(dir) {
            let _ = handle.sync_all();
        }
        Ok(())
    }
}

impl RenderCacheStore for FileRenderCacheStore {
    fn load_commands(&self, key: &CacheKey) -> Option<CommandList> {
        match self.read_entry(key) {
            Ok(found) => found,
            Err(err) => {
                if err.kind() != io::ErrorKind::NotFound {
                    debug!("render cache read {} failed: {}", key, err);
                }
                None
            }
        }
    }

    fn store_commands(&self, key: &CacheKey, commands: &CommandList) {
        if let Err(err) = self.write_entry(key, commands) {
            debug!("render cache write {} skipped: {}", key, err);
        }
    }
}

fn write_synced(path: &Path, payload: &[u8]) -> io::Result<()> {
    let mut file = OpenOptions::new().write(true).create_new(true).open(path)?;
    file.write_all(payload)?;
    file.sync_all()
}

/// On-disk entry as read back.
#[derive(Debug, Deserialize)]
struct StoredCommands {
    version: u8,
    /// `CacheKey` display form.
    key: String,
    commands: CommandList,
}

impl StoredCommands {
    fn matching(self, key: &CacheKey) -> Option<CommandList> {
        if self.version != CACHE_SCHEMA_VERSION || self.key != key.to_string() {
            trace!("render cache entry {} is stale", key);
            return None;
        }
        Some(self.commands)
    }
}

#[derive(Serialize)]
struct StoredCommandsRef<'c> {
    version: u8,
    key: String,
    commands: &'c CommandList,
}

/// Commands produced for one markup text.
#[derive(Clone, Debug, PartialEq)]
pub struct PreparedText {
    pub key: CacheKey,
    pub commands: CommandList,
    pub from_cache: bool,
}

/// Top-level entry point: owns the configuration stack, the cache and the
/// diagnostics sink, and drives layout plus drawing.
#[derive(Clone)]
pub struct RichTextRenderer {
    configs: ConfigStack,
    cache: Option<Arc<dyn RenderCacheStore + Send + Sync>>,
    diagnostic_sink: DiagnosticSink,
}

impl fmt::Debug for RichTextRenderer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RichTextRenderer")
            .field("configs", &self.configs)
            .field("has_cache", &self.cache.is_some())
            .finish_non_exhaustive()
    }
}

impl Default for RichTextRenderer {
    fn default() -> Self {
        Self::new(RenderConfig::default())
    }
}

impl RichTextRenderer {
    /// Create a renderer whose base configuration is `config`.
    pub fn new(config: RenderConfig) -> Self {
        Self {
            configs: ConfigStack::new(config),
            cache: None,
            diagnostic_sink: None,
        }
    }

    /// Attach a command cache.
    pub fn with_cache_store(mut self, store: Arc<dyn RenderCacheStore + Send + Sync>) -> Self {
        self.cache = Some(store);
        self
    }

    /// Register or replace the diagnostics sink.
    pub fn set_diagnostic_sink<F>(&mut self, sink: F)
    where
        F: FnMut(RenderDiagnostic) + Send + 'static,
    {
        self.diagnostic_sink = Some(Arc::new(Mutex::new(Box::new(sink)))); // allow: once, diagnostic setup
    }

    fn emit_diagnostic(&self, diagnostic: RenderDiagnostic) {
        let Some(sink) = &self.diagnostic_sink else {
            return;
        };
        if let Ok(mut sink) = sink.lock() {
            sink(diagnostic);
        }
    }

    /// Active configuration.
    pub fn config(&self) -> &RenderConfig {
        self.configs.current()
    }

    /// Mutable active configuration. Invalidates cached layouts.
    pub fn config_mut(&mut self) -> &mut RenderConfig {
        self.configs.current_mut()
    }

    /// Enter a nested configuration scope.
    pub fn push_config(&mut self, config: RenderConfig) {
        self.configs.push(config);
    }

    /// Leave the innermost configuration scope.
    pub fn pop_config(&mut self) -> Option<RenderConfig> {
        self.configs.pop()
    }

    pub fn config_stack(&self) -> &ConfigStack {
        &self.configs
    }

    /// Lay out `text` for `width` (non-positive means unbounded) at the
    /// origin, consulting the cache first.
    pub fn prepare(&self, text: &str, width: f32) -> PreparedText {
        let bounds = Size::new(width, 0.0);
        let key = CacheKey::new(text, self.configs.version(), bounds);
        if let Some(commands) = self.cache.as_ref().and_then(|c| c.load_commands(&key)) {
            trace!("render cache hit {}", key);
            self.emit_diagnostic(RenderDiagnostic::CacheHit {
                key,
                command_count: commands.commands.len(),
            });
            return PreparedText {
                key,
                commands,
                from_cache: true,
            };
        }
        if self.cache.is_some() {
            self.emit_diagnostic(RenderDiagnostic::CacheMiss { key });
        }

        let config = self.configs.current();
        let outcome = layout_with_sink(text, config, bounds, |diagnostic| {
            self.emit_diagnostic(RenderDiagnostic::Markup(diagnostic.clone()))
        });
        let mut commands = CommandList::from_drawables(&outcome.drawables, config, Point::default());
        commands.complete = outcome.is_complete();
        debug!(
            "prepared {} commands ({}x{}) for {} bytes",
            commands.commands.len(),
            commands.width,
            commands.height,
            text.len()
        );
        if let Some(cache) = &self.cache {
            cache.store_commands(&key, &commands);
        }
        PreparedText {
            key,
            commands,
            from_cache: false,
        }
    }

    /// Lay out `text` inside `bounds` and draw it on `backend`.
    ///
    /// Drawing is clipped to `bounds`. An empty area short-circuits before
    /// any layout and returns `None`.
    pub fn render<B: DrawBackend + ?Sized>(
        &self,
        text: &str,
        bounds: Rect,
        backend: &mut B,
        clock: &FrameClock,
    ) -> Option<PreparedText> {
        if bounds.width <= 0.0 || bounds.height <= 0.0 {
            self.emit_diagnostic(RenderDiagnostic::SkippedEmptyBounds);
            return None;
        }
        let prepared = self.prepare(text, bounds.width);
        backend.push_clip(bounds);
        let mut target = OffsetBackend {
            inner: &mut *backend,
            origin: Point::new(bounds.x, bounds.y),
        };
        execute_commands(&prepared.commands, &mut target, clock);
        backend.pop_clip();
        Some(prepared)
    }
}

/// Translates every primitive by `origin`.
struct OffsetBackend<'b, B: ?Sized> {
    inner: &'b mut B,
    origin: Point,
}

impl<B: DrawBackend + ?Sized> OffsetBackend<'_, B> {
    fn point(&self, p: Point) -> Point {
        Point::new(p.x + self.origin.x, p.y + self.origin.y)
    }

    fn rect(&self, r: Rect) -> Rect {
        Rect::new(r.x + self.origin.x, r.y + self.origin.y, r.width, r.height)
    }
}

impl<B: DrawBackend + ?Sized> DrawBackend for OffsetBackend<'_, B> {
    fn draw_line(&mut self, from: Point, to: Point, thickness: f32, color: Color) {
        let (from, to) = (self.point(from), self.point(to));
        self.inner.draw_line(from, to, thickness, color);
    }

    fn fill_rect(&mut self, rect: Rect, color: Color) {
        let rect = self.rect(rect);
        self.inner.fill_rect(rect, color);
    }

    fn fill_gradient_rect(&mut self, rect: Rect, top: Color, bottom: Color) {
        let rect = self.rect(rect);
        self.inner.fill_gradient_rect(rect, top, bottom);
    }

    fn fill_triangle(&mut self, a: Point, b: Point, c: Point, color: Color) {
        let (a, b, c) = (self.point(a), self.point(b), self.point(c));
        self.inner.fill_triangle(a, b, c, color);
    }

    fn fill_circle(&mut self, center: Point, radius: f32, color: Color) {
        let center = self.point(center);
        self.inner.fill_circle(center, radius, color);
    }

    fn stroke_circle(&mut self, center: Point, radius: f32, thickness: f32, color: Color) {
        let center = self.point(center);
        self.inner.stroke_circle(center, radius, thickness, color);
    }

    fn draw_text(&mut self, origin: Point, text: &str, font: FontHandle, color: Color) {
        let origin = self.point(origin);
        self.inner.draw_text(origin, text, font, color);
    }

    fn push_clip(&mut self, rect: Rect) {
        let rect = self.rect(rect);
        self.inner.push_clip(rect);
    }

    fn pop_clip(&mut self) {
        self.inner.pop_clip();
    }

    fn draw_custom_bullet(&mut self, rect: Rect, depth: u8, color: Color) -> bool {
        let rect = self.rect(rect);
        self.inner.draw_custom_bullet(rect, depth, color)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rich_markup::{MarkupErrorKind, Severity};

    #[derive(Default)]
    struct Recorder {
        texts: Vec<(f32, f32, String)>,
        clips: Vec<Rect>,
        pops: usize,
    }

    impl DrawBackend for Recorder {
        fn draw_line(&mut self, _from: Point, _to: Point, _thickness: f32, _color: Color) {}

        fn fill_rect(&mut self, _rect: Rect, _color: Color) {}

        fn fill_triangle(&mut self, _a: Point, _b: Point, _c: Point, _color: Color) {}

        fn fill_circle(&mut self, _center: Point, _radius: f32, _color: Color) {}

        fn draw_text(&mut self, origin: Point, text: &str, _font: FontHandle, _color: Color) {
            self.texts.push((origin.x, origin.y, text.to_string()));
        }

        fn push_clip(&mut self, rect: Rect) {
            self.clips.push(rect);
        }

        fn pop_clip(&mut self) {
            self.pops += 1;
        }
    }

    fn temp_cache_root(label: &str) -> PathBuf {
        let nonce = CACHE_WRITE_NONCE.fetch_add(1, Ordering::Relaxed);
        std::env::temp_dir().join(format!(
            "rich-markup-render-{label}-{}-{nonce}",
            std::process::id()
        ))
    }

    fn sample_commands() -> CommandList {
        RichTextRenderer::default().prepare("<p>cached <b>text</b></p>", 200.0).commands
    }

    #[test]
    fn render_translates_and_clips() {
        let renderer = RichTextRenderer::default();
        let mut backend = Recorder::default();
        let prepared = renderer
            .render(
                "hello",
                Rect::new(5.0, 7.0, 100.0, 50.0),
                &mut backend,
                &FrameClock::default(),
            )
            .expect("non-empty bounds render");
        assert!(prepared.commands.complete);
        assert_eq!(backend.texts, [(5.0, 7.0, "hello".to_string())]);
        assert_eq!(backend.clips, [Rect::new(5.0, 7.0, 100.0, 50.0)]);
        assert_eq!(backend.pops, 1);
    }

    #[test]
    fn empty_bounds_short_circuit() {
        let mut renderer = RichTextRenderer::default();
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        renderer.set_diagnostic_sink(move |d| sink.lock().unwrap().push(d));
        let mut backend = Recorder::default();
        let out = renderer.render(
            "x",
            Rect::new(0.0, 0.0, 0.0, 10.0),
            &mut backend,
            &FrameClock::default(),
        );
        assert!(out.is_none());
        assert!(backend.texts.is_empty() && backend.clips.is_empty());
        assert_eq!(*seen.lock().unwrap(), [RenderDiagnostic::SkippedEmptyBounds]);
    }

    #[test]
    fn markup_diagnostics_reach_sink() {
        let mut renderer = RichTextRenderer::default();
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        renderer.set_diagnostic_sink(move |d| sink.lock().unwrap().push(d));
        let prepared = renderer.prepare("<b>a</i>", 100.0);
        assert!(!prepared.commands.complete);
        let seen = seen.lock().unwrap();
        assert!(seen.iter().any(|d| matches!(
            d,
            RenderDiagnostic::Markup(m)
                if m.severity == Severity::Fatal
                    && m.error.kind == MarkupErrorKind::MismatchedClosingTag
        )));
    }

    #[test]
    fn memory_cache_hits_until_config_changes() {
        let cache = Arc::new(MemoryRenderCache::new(4));
        let mut renderer = RichTextRenderer::default().with_cache_store(cache.clone());
        let first = renderer.prepare("<i>same</i>", 120.0);
        assert!(!first.from_cache);
        let second = renderer.prepare("<i>same</i>", 120.0);
        assert!(second.from_cache);
        assert_eq!(second.commands, first.commands);

        renderer.config_mut().line_gap = 10.0;
        let third = renderer.prepare("<i>same</i>", 120.0);
        assert!(!third.from_cache);
        assert_ne!(third.key, first.key);
        assert_eq!(cache.len(), 2);
    }

    #[test]
    fn renderers_sharing_a_cache_keep_their_own_layouts() {
        let cache = Arc::new(MemoryRenderCache::new(4));
        let small = RichTextRenderer::default().with_cache_store(cache.clone());
        let mut large_config = RenderConfig::default();
        large_config.font_scale = 3.0;
        let large = RichTextRenderer::new(large_config).with_cache_store(cache.clone());

        let a = small.prepare("text", 0.0);
        let b = large.prepare("text", 0.0);
        assert!(!a.from_cache);
        assert!(!b.from_cache);
        assert_ne!(a.key, b.key);
        assert_eq!(b.commands.height, a.commands.height * 3.0);
        assert_eq!(cache.len(), 2);
    }

    #[test]
    fn memory_cache_evicts_least_recent() {
        let cache = MemoryRenderCache::new(2);
        let commands = CommandList::default();
        let key = |n: &str| CacheKey::new(n, 0, Size::ZERO);
        cache.store_commands(&key("a"), &commands);
        cache.store_commands(&key("b"), &commands);
        assert!(cache.load_commands(&key("a")).is_some());
        cache.store_commands(&key("c"), &commands);
        assert!(cache.load_commands(&key("b")).is_none());
        assert!(cache.load_commands(&key("a")).is_some());
        assert!(cache.load_commands(&key("c")).is_some());
        assert_eq!(cache.len(), 2);
    }

    #[test]
    fn config_scopes_change_layout() {
        let mut renderer = RichTextRenderer::default();
        let base = renderer.prepare("text", 0.0);
        let mut bigger = renderer.config().clone();
        bigger.font_scale = 2.0;
        renderer.push_config(bigger);
        let scaled = renderer.prepare("text", 0.0);
        assert_eq!(scaled.commands.height, base.commands.height * 2.0);
        assert!(renderer.pop_config().is_some());
        assert_eq!(renderer.prepare("text", 0.0).commands, base.commands);
        assert_eq!(renderer.config_stack().depth(), 0);
    }

    #[test]
    fn file_cache_round_trip_and_layout() {
        let root = temp_cache_root("roundtrip");
        let store = FileRenderCacheStore::new(&root).with_namespace("profile/a");
        let key = CacheKey::new("<p>cached <b>text</b></p>", 0, Size::new(200.0, 0.0));
        let commands = sample_commands();
        store.store_commands(&key, &commands);

        let path = store.cache_path(&key);
        assert!(path.starts_with(root.join("profile_a")));
        let json = fs::read_to_string(&path).expect("cache file written");
        let payload: serde_json::Value = serde_json::from_str(&json).expect("cache JSON parses");
        assert_eq!(payload["version"], CACHE_SCHEMA_VERSION);

        assert_eq!(store.load_commands(&key), Some(commands));
        let other = CacheKey::new("other", 0, Size::ZERO);
        assert!(store.load_commands(&other).is_none());

        let _ = fs::remove_dir_all(root);
    }

    #[test]
    fn file_cache_overwrite_leaves_only_the_entry() {
        let root = temp_cache_root("overwrite");
        let store = FileRenderCacheStore::new(&root);
        let key = CacheKey::new("x", 0, Size::ZERO);
        store.store_commands(&key, &CommandList::default());
        let commands = sample_commands();
        store.store_commands(&key, &commands);
        assert_eq!(store.load_commands(&key), Some(commands));
        let names: Vec<_> = fs::read_dir(root.join(DEFAULT_CACHE_NAMESPACE))
            .expect("namespace dir")
            .filter_map(|entry| entry.ok())
            .map(|entry| entry.file_name())
            .collect();
        assert_eq!(names, [std::ffi::OsString::from(format!("{key}.json"))]);
        let _ = fs::remove_dir_all(root);
    }

    #[test]
    fn file_cache_respects_size_cap() {
        let root = temp_cache_root("cap");
        let store = FileRenderCacheStore::new(&root).with_max_file_bytes(16);
        let key = CacheKey::new("x", 0, Size::ZERO);
        store.store_commands(&key, &sample_commands());
        assert!(!store.cache_path(&key).exists());
        assert!(store.load_commands(&key).is_none());
        let leftovers = fs::read_dir(root.join(DEFAULT_CACHE_NAMESPACE))
            .map(|dir| dir.count())
            .unwrap_or(0);
        assert_eq!(leftovers, 0);
        let _ = fs::remove_dir_all(root);
    }

    #[test]
    fn file_cache_rejects_schema_mismatch() {
        let root = temp_cache_root("schema");
        let store = FileRenderCacheStore::new(&root);
        let key = CacheKey::new("x", 0, Size::ZERO);
        let path = store.cache_path(&key);
        fs::create_dir_all(path.parent().expect("has parent")).expect("mkdir");
        let payload = serde_json::json!({
            "version": CACHE_SCHEMA_VERSION + 1,
            "key": key.to_string(),
            "commands": { "commands": [], "width": 0.0, "height": 0.0, "complete": true }
        });
        fs::write(&path, payload.to_string()).expect("write");
        assert!(store.load_commands(&key).is_none());
        let _ = fs::remove_dir_all(root);
    }
}
