pub mod channels;

pub use channels::{PageChannels, RuntimeChannels};
