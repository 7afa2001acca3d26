pub mod clock;

pub use clock::{Clock, FixedClock, SystemClock};

/// Error type returned across the model seam.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Model input vector.
///
/// The models are trained on `[humidity, temperature, time_remaining]` in that
/// order; `as_array` is the only place the order is spelled out.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Features {
    pub humidity: f64,
    pub temperature: f64,
    pub time_remaining: f64,
}

impl Features {
    pub const LEN: usize = 3;

    pub fn new(humidity: f64, temperature: f64, time_remaining: f64) -> Self {
        Self {
            humidity,
            temperature,
            time_remaining,
        }
    }

    #[inline]
    pub fn as_array(&self) -> [f64; Self::LEN] {
        [self.humidity, self.temperature, self.time_remaining]
    }
}

pub trait StatusClassifier {
    /// Dryness label for the given features.
    fn classify(&self, features: &Features) -> Result<String, BoxError>;
}

pub trait MoistureRegressor {
    /// Estimated moisture content (percent) for the given features.
    fn estimate(&self, features: &Features) -> Result<f64, BoxError>;
}
