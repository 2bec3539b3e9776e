mod layout;
mod pen;
mod presets;
mod spotlight;
mod stage;

use crate::audio::AudioFeatures;
use crate::color::Rgb;
use crate::surface::{Surface, SurfaceScope};
use std::collections::HashSet;
use std::f32::consts::TAU;
use std::fmt;

pub use layout::{RandomLayoutCache, LAYOUT_POINTS};
pub use pen::{Pen, PenScope};
pub use presets::make_presets;
pub use spotlight::{Spotlight, SPOTLIGHT_POOL};
pub use stage::{
    advance_phase, advance_scroll, randomize_interval, refresh_due, ring_angle, ring_point, Inks,
    Stage, SCROLL_MARGIN,
};

const MIN_EXTENT: f32 = 1.0;

/// Drawable area in world units plus the device pixel ratio that maps it to
/// device pixels.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Viewport {
    pub width: f32,
    pub height: f32,
    pub dpr: f32,
}

impl Viewport {
    /// Degenerate sizes are clamped so width, height and dpr are always > 0.
    pub fn new(width: f32, height: f32, dpr: f32) -> Self {
        let pos = |v: f32, min: f32| if v.is_finite() { v.max(min) } else { min };
        Self {
            width: pos(width, MIN_EXTENT),
            height: pos(height, MIN_EXTENT),
            dpr: if dpr.is_finite() && dpr > 0.0 { dpr } else { 1.0 },
        }
    }

    /// Viewport spanning `world_width` units across `pixel_w` device pixels.
    pub fn from_pixels(pixel_w: u32, pixel_h: u32, world_width: f32) -> Self {
        let pw = (pixel_w as f32).max(MIN_EXTENT);
        let ph = (pixel_h as f32).max(MIN_EXTENT);
        let dpr = pw / world_width.max(MIN_EXTENT);
        Self::new(pw / dpr, ph / dpr, dpr)
    }

    pub fn min_side(&self) -> f32 {
        self.width.min(self.height)
    }
}

impl Default for Viewport {
    fn default() -> Self {
        Self::new(960.0, 540.0, 1.0)
    }
}

/// Operator controls. Values are clamped whenever they enter through a setter
/// or [`Controls::sanitize`].
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Controls {
    pub speed: f32,
    pub size: f32,
    pub size_dest: f32,
    pub brightness: f32,
    pub brightness_dest: f32,
    pub strobe: f32,
    pub shading: f32,
    pub color_a: Rgb,
    pub color_b: Rgb,
    pub multicolor: bool,
}

impl Default for Controls {
    fn default() -> Self {
        Self {
            speed: 50.0,
            size: 50.0,
            size_dest: 50.0,
            brightness: 100.0,
            brightness_dest: 100.0,
            strobe: 0.0,
            shading: 0.0,
            color_a: Rgb::new(255, 0, 0),
            color_b: Rgb::new(0, 32, 255),
            multicolor: false,
        }
    }
}

fn pct(v: f32) -> f32 {
    if v.is_finite() { v.clamp(0.0, 100.0) } else { 0.0 }
}

impl Controls {
    pub fn set_speed(&mut self, v: f32) {
        self.speed = pct(v);
    }

    /// Sets the size destination; the live value follows through [`Controls::smooth`].
    pub fn set_size(&mut self, v: f32) {
        self.size_dest = pct(v);
    }

    pub fn set_brightness(&mut self, v: f32) {
        self.brightness_dest = pct(v);
    }

    pub fn set_strobe(&mut self, v: f32) {
        self.strobe = pct(v);
    }

    pub fn set_shading(&mut self, v: f32) {
        self.shading = pct(v);
    }

    /// Jumps size and brightness straight to their destinations.
    pub fn settle(&mut self) {
        self.size = self.size_dest;
        self.brightness = self.brightness_dest;
    }

    pub fn sanitize(&mut self) {
        self.speed = pct(self.speed);
        self.size = pct(self.size);
        self.size_dest = pct(self.size_dest);
        self.brightness = pct(self.brightness);
        self.brightness_dest = pct(self.brightness_dest);
        self.strobe = pct(self.strobe);
        self.shading = pct(self.shading);
    }

    /// Exponential approach of size and brightness toward their destinations.
    pub fn smooth(&mut self, dt: f32) {
        let k = 1.0 - (-dt.max(0.0) * 6.0).exp();
        self.size += (self.size_dest - self.size) * k;
        self.brightness += (self.brightness_dest - self.brightness) * k;
        if (self.size_dest - self.size).abs() < 0.01 {
            self.size = self.size_dest;
        }
        if (self.brightness_dest - self.brightness).abs() < 0.01 {
            self.brightness = self.brightness_dest;
        }
    }
}

/// Per-frame input to the preset engine, owned by the orchestrator.
#[derive(Clone, Debug, PartialEq)]
pub struct RenderContext {
    /// Milliseconds since the show started.
    pub now_ms: f64,
    /// Seconds since the previous frame, already clamped.
    pub dt: f32,
    pub viewport: Viewport,
    pub controls: Controls,
    /// Motion offset in world units.
    pub offset: (f32, f32),
    /// When false the engine draws nothing and advances nothing.
    pub enabled: bool,
}

impl Default for RenderContext {
    fn default() -> Self {
        Self {
            now_ms: 0.0,
            dt: 1.0 / 60.0,
            viewport: Viewport::default(),
            controls: Controls::default(),
            offset: (0.0, 0.0),
            enabled: true,
        }
    }
}

/// Persistent per-preset accumulators. Never reset on preset switches.
#[derive(Clone, Debug, PartialEq)]
pub struct PresetSlot {
    pub phase: f32,
    pub scroll: f32,
    pub ends: [(f32, f32); 4],
    pub randomized_at: f64,
    pub seeded: bool,
    /// Generic step counter (half arc sweep, tunnel size).
    pub step: f32,
    /// Small discrete choice (half arc origin).
    pub pick: usize,
    /// Randomized length (half arc radius).
    pub extent: f32,
    pub flip: bool,
    /// Free-running rotation for presets that own one.
    pub spin: f32,
}

impl Default for PresetSlot {
    fn default() -> Self {
        Self {
            phase: 0.0,
            scroll: -SCROLL_MARGIN,
            ends: [(0.0, 0.0); 4],
            randomized_at: f64::NEG_INFINITY,
            seeded: false,
            step: 0.0,
            pick: 0,
            extent: 0.0,
            flip: false,
            spin: 0.0,
        }
    }
}

pub type DrawFn = fn(&mut Stage<'_>, &mut PresetSlot);

#[derive(Clone, Copy)]
pub struct PresetDef {
    pub id: usize,
    pub name: &'static str,
    pub draw: DrawFn,
    /// Regenerate the layout cache whenever this preset becomes active.
    pub reseed_on_activate: bool,
    /// Divisor of a free-running spin advanced every drawn frame, active or not.
    pub free_spin: Option<f32>,
}

impl fmt::Debug for PresetDef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PresetDef")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("reseed_on_activate", &self.reseed_on_activate)
            .field("free_spin", &self.free_spin)
            .finish()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RegistryError {
    Empty,
    DuplicateId(usize),
    MissingId(usize),
    EmptyName(usize),
    DuplicateName(&'static str),
}

impl fmt::Display for RegistryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Empty => write!(f, "preset registry is empty"),
            Self::DuplicateId(id) => write!(f, "preset id {id} registered twice"),
            Self::MissingId(id) => write!(f, "preset id {id} has no routine"),
            Self::EmptyName(id) => write!(f, "preset id {id} has an empty name"),
            Self::DuplicateName(name) => write!(f, "preset name {name:?} registered twice"),
        }
    }
}

impl std::error::Error for RegistryError {}

/// Preset records keyed by a dense id range `0..N`, validated on construction.
#[derive(Debug, Clone)]
pub struct PresetRegistry {
    defs: Vec<PresetDef>,
}

impl PresetRegistry {
    pub fn new(mut defs: Vec<PresetDef>) -> Result<Self, RegistryError> {
        if defs.is_empty() {
            return Err(RegistryError::Empty);
        }
        let mut names = HashSet::new();
        for def in &defs {
            if def.name.trim().is_empty() {
                return Err(RegistryError::EmptyName(def.id));
            }
            if !names.insert(def.name) {
                return Err(RegistryError::DuplicateName(def.name));
            }
        }
        defs.sort_by_key(|d| d.id);
        for (expected, pair) in defs.windows(2).enumerate() {
            if pair[0].id == pair[1].id {
                return Err(RegistryError::DuplicateId(pair[0].id));
            }
            if pair[0].id != expected {
                return Err(RegistryError::MissingId(expected));
            }
        }
        let last = defs.len() - 1;
        if defs[last].id != last {
            return Err(RegistryError::MissingId(last));
        }
        Ok(Self { defs })
    }

    pub fn len(&self) -> usize {
        self.defs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.defs.is_empty()
    }

    pub fn get(&self, id: usize) -> Option<&PresetDef> {
        self.defs.get(id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &PresetDef> {
        self.defs.iter()
    }

    /// First preset whose name contains `query`, case-insensitively.
    pub fn find(&self, query: &str) -> Option<usize> {
        let q = query.trim().to_ascii_lowercase();
        if q.is_empty() {
            return None;
        }
        self.defs
            .iter()
            .find(|d| d.name.to_ascii_lowercase().contains(&q))
            .map(|d| d.id)
    }
}

/// Owns the registry, one slot per preset, and the shared layout cache and
/// spotlight pool.
pub struct PresetEngine {
    registry: PresetRegistry,
    slots: Vec<PresetSlot>,
    layout: RandomLayoutCache,
    spotlights: Vec<Spotlight>,
    rng: fastrand::Rng,
    viewport: Viewport,
    active: Option<usize>,
}

impl PresetEngine {
    pub fn new(seed: u64) -> Result<Self, RegistryError> {
        Self::with_presets(make_presets(), seed)
    }

    pub fn with_presets(defs: Vec<PresetDef>, seed: u64) -> Result<Self, RegistryError> {
        let registry = PresetRegistry::new(defs)?;
        tracing::debug!(presets = registry.len(), "preset registry validated");
        let mut rng = fastrand::Rng::with_seed(seed);
        let viewport = Viewport::default();
        let mut layout = RandomLayoutCache::new();
        layout.regenerate(viewport.width, viewport.height, &mut rng);
        let spotlights = spotlight::spawn_pool(viewport.width, viewport.height, &mut rng);
        let slots = vec![PresetSlot::default(); registry.len()];
        Ok(Self {
            registry,
            slots,
            layout,
            spotlights,
            rng,
            viewport,
            active: None,
        })
    }

    pub fn registry(&self) -> &PresetRegistry {
        &self.registry
    }

    pub fn len(&self) -> usize {
        self.registry.len()
    }

    pub fn is_empty(&self) -> bool {
        self.registry.is_empty()
    }

    pub fn names(&self) -> Vec<&'static str> {
        self.registry.iter().map(|d| d.name).collect()
    }

    pub fn name(&self, id: usize) -> &'static str {
        self.registry.get(id).map(|d| d.name).unwrap_or("<none>")
    }

    pub fn slot(&self, id: usize) -> Option<&PresetSlot> {
        self.slots.get(id)
    }

    /// Id of the preset drawn most recently.
    pub fn active(&self) -> Option<usize> {
        self.active
    }

    pub fn layout(&self) -> &RandomLayoutCache {
        &self.layout
    }

    pub fn spotlights(&self) -> &[Spotlight] {
        &self.spotlights
    }

    pub fn viewport(&self) -> Viewport {
        self.viewport
    }

    /// Adopts a new drawable size and regenerates the layout cache for it.
    pub fn resize(&mut self, viewport: Viewport) {
        self.viewport = viewport;
        self.layout
            .regenerate(viewport.width, viewport.height, &mut self.rng);
        tracing::debug!(
            width = viewport.width,
            height = viewport.height,
            dpr = viewport.dpr,
            "layout regenerated for new viewport"
        );
    }

    /// Draws one frame of preset `id`. Returns whether anything was drawn.
    pub fn render(
        &mut self,
        id: usize,
        audio: &AudioFeatures,
        ctx: &RenderContext,
        surface: &mut dyn Surface,
    ) -> bool {
        if !ctx.enabled {
            return false;
        }
        let Some(def) = self.registry.get(id).copied() else {
            tracing::warn!(id, presets = self.registry.len(), "unknown preset id, frame skipped");
            return false;
        };

        if ctx.viewport.width != self.viewport.width || ctx.viewport.height != self.viewport.height
        {
            self.resize(ctx.viewport);
        } else {
            self.viewport.dpr = ctx.viewport.dpr;
        }

        if self.active != Some(id) {
            self.activate(&def);
        }

        let fs = ctx.dt.max(0.0) * 60.0;
        for d in self.registry.iter() {
            if let Some(divisor) = d.free_spin {
                let slot = &mut self.slots[d.id];
                slot.spin = advance_phase(slot.spin, ctx.controls.speed, divisor, fs);
            }
        }

        let mut scope = SurfaceScope::new(surface);
        let pen = Pen::new(&mut *scope, ctx.viewport.dpr, ctx.offset);
        let mut stage = Stage {
            ctx,
            audio,
            inks: Inks::from_context(ctx),
            pen,
            layout: &mut self.layout,
            spotlights: &mut self.spotlights,
            rng: &mut self.rng,
            fs,
        };
        (def.draw)(&mut stage, &mut self.slots[id]);
        true
    }

    fn activate(&mut self, def: &PresetDef) {
        if def.reseed_on_activate {
            self.layout
                .regenerate(self.viewport.width, self.viewport.height, &mut self.rng);
        }
        tracing::debug!(
            id = def.id,
            name = def.name,
            reseed = def.reseed_on_activate,
            "preset activated"
        );
        self.active = Some(def.id);
    }
}

/// Shortest signed angular distance from `a` to `b`.
pub fn angle_delta(a: f32, b: f32) -> f32 {
    let d = (b - a).rem_euclid(TAU);
    if d > TAU * 0.5 { d - TAU } else { d }
}
