pub mod ohlcv;
pub mod price_scale;
pub mod scale;
pub mod time_index;
pub mod time_scale;
pub mod timeframe;
pub mod types;

pub use ohlcv::{OhlcvBar, is_strictly_sorted};
pub use price_scale::{PriceScale, PriceScaleTuning};
pub use scale::LinearScale;
pub use time_index::TimeIndex;
pub use time_scale::{LogicalRange, TimeScale, TimeScaleTuning};
pub use timeframe::Timeframe;
pub use types::{ScreenPoint, Viewport};
