/// Monotonic millisecond time source.
pub trait TimeSource {
    fn now_ms(&self) -> f64;
}

/// `performance.now()` in the browser.
#[cfg(target_arch = "wasm32")]
pub struct PerformanceTime {
    performance: Option<web_sys::Performance>,
}

#[cfg(target_arch = "wasm32")]
impl PerformanceTime {
    pub fn new() -> Self {
        Self {
            performance: web_sys::window().and_then(|w| w.performance()),
        }
    }
}

#[cfg(target_arch = "wasm32")]
impl TimeSource for PerformanceTime {
    fn now_ms(&self) -> f64 {
        self.performance.as_ref().map(|p| p.now()).unwrap_or(0.0)
    }
}

#[cfg(not(target_arch = "wasm32"))]
pub struct InstantTime {
    start: std::time::Instant,
}

#[cfg(not(target_arch = "wasm32"))]
impl InstantTime {
    pub fn new() -> Self {
        Self { start: std::time::Instant::now() }
    }
}

#[cfg(not(target_arch = "wasm32"))]
impl TimeSource for InstantTime {
    fn now_ms(&self) -> f64 {
        self.start.elapsed().as_secs_f64() * 1000.0
    }
}

/// Frame delta sampler. The first sample is 0 and no sample is ever negative,
/// even if the source steps backwards.
pub struct SimulationClock {
    source: Box<dyn TimeSource>,
    last_ms: Option<f64>,
    max_delta: Option<f32>,
}

impl SimulationClock {
    pub fn new(source: Box<dyn TimeSource>, max_delta: Option<f32>) -> Self {
        Self { source, last_ms: None, max_delta }
    }

    /// Seconds since the previous sample.
    pub fn delta(&mut self) -> f32 {
        let now = self.source.now_ms();
        let elapsed_ms = match self.last_ms {
            Some(last) if now > last => now - last,
            Some(_) => 0.0,
            None => 0.0,
        };
        self.last_ms = Some(self.last_ms.map_or(now, |last| last.max(now)));

        let dt = (elapsed_ms / 1000.0) as f32;
        match self.max_delta {
            Some(max) => dt.min(max),
            None => dt,
        }
    }
}
