//! Level curves and the curve registry.
//!
//! A curve maps accumulated XP to a level and back. Guild config names its
//! curve; the registry resolves that name. The registry is an explicit object
//! handed to the service, never process-global state.

use std::collections::HashMap;
use std::sync::Arc;

/// Mapping between accumulated XP and levels.
///
/// Implementations must keep `level_for_xp(xp_for_level(n)) == n` for all
/// levels they produce.
pub trait LevelCurve: Send + Sync {
    /// Level reached at the given XP total.
    fn level_for_xp(&self, xp: u64) -> u32;

    /// Minimum XP total required for the given level.
    fn xp_for_level(&self, level: u32) -> u64;
}

/// Quadratic curve: level `n` requires `100 * n^2` XP.
#[derive(Debug, Clone, Copy, Default)]
pub struct StandardCurve;

impl LevelCurve for StandardCurve {
    fn level_for_xp(&self, xp: u64) -> u32 {
        (((xp / 100) as f64).sqrt()) as u32
    }

    fn xp_for_level(&self, level: u32) -> u64 {
        100 * (level as u64) * (level as u64)
    }
}

/// Flat curve: every level costs the same amount of XP.
///
/// An `xp_per_level` of zero is treated as one.
#[derive(Debug, Clone, Copy)]
pub struct LinearCurve {
    pub xp_per_level: u64,
}

impl LinearCurve {
    fn step(&self) -> u64 {
        self.xp_per_level.max(1)
    }
}

impl LevelCurve for LinearCurve {
    fn level_for_xp(&self, xp: u64) -> u32 {
        (xp / self.step()) as u32
    }

    fn xp_for_level(&self, level: u32) -> u64 {
        self.step() * level as u64
    }
}

/// Registry of named level curves.
#[derive(Clone, Default)]
pub struct CurveRegistry {
    curves: HashMap<String, Arc<dyn LevelCurve>>,
}

impl CurveRegistry {
    /// Empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry preloaded with `standard` and `linear` curves.
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        registry.register("standard", StandardCurve);
        registry.register("linear", LinearCurve { xp_per_level: 1_000 });
        registry
    }

    /// Register a curve under a name, replacing any previous curve.
    pub fn register(&mut self, name: impl Into<String>, curve: impl LevelCurve + 'static) {
        self.curves.insert(name.into(), Arc::new(curve));
    }

    /// Look up a curve by name.
    pub fn get(&self, name: &str) -> Option<Arc<dyn LevelCurve>> {
        self.curves.get(name).cloned()
    }

    /// Look up a curve by name, falling back to [`StandardCurve`] for
    /// unknown names.
    pub fn get_or_standard(&self, name: &str) -> Arc<dyn LevelCurve> {
        self.get(name).unwrap_or_else(|| Arc::new(StandardCurve))
    }

    /// Registered curve names.
    pub fn names(&self) -> Vec<&str> {
        self.curves.keys().map(String::as_str).collect()
    }
}

impl std::fmt::Debug for CurveRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CurveRegistry")
            .field("curves", &self.curves.keys().collect::<Vec<_>>())
            .finish()
    }
}
