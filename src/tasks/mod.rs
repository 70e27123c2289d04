mod sweeper;

pub use sweeper::{ExpirySweeper, SweeperError};
