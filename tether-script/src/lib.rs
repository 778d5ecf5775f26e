pub mod frame;
pub mod loopback;
pub mod process;

pub use frame::{FrameError, decode_frame, encode_frame};
pub use loopback::Loopback;
pub use process::{ModuleCommand, ModuleProcess};
