//! Small generic building blocks for concurrent programs.
//!
//! * [`BoundedBlockingQueue`]: fixed-capacity FIFO with blocking, timed,
//!   non-blocking and async put/take.
//! * [`Map`]: a map shared between threads.
//! * [`Set`]: a plain unordered set.

pub mod map;
pub mod queue;
pub mod set;

mod trace;

pub use map::Map;
pub use queue::{BoundedBlockingQueue, Queue};
pub use set::Set;
pub use trace::init_tracing;

pub mod prelude {
    pub use crate::queue::{BoundedBlockingQueue, Queue};
}
