pub mod bus;
pub mod progress;

pub use bus::EventBus;
pub use progress::{ProgressEvent, ProgressRegistry, ProgressSubscription};

pub mod prelude {
    pub use crate::bus::EventBus;
    pub use crate::progress::{ProgressEvent, ProgressRegistry, ProgressSubscription};
}
