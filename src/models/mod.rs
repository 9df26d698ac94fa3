pub mod action;
pub mod order;
pub mod price;
pub mod signal;

pub use action::{Direction, OrderAction, ParsedAction};
pub use order::{MarketOrder, OrderPayload, PendingOrder};
pub use price::LivePrice;
pub use signal::{Normalized, RawSignal, SignalWarning, ValidatedSignal};
