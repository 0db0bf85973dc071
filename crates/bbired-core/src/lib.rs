pub mod background;
pub mod calib;
pub mod consts;
pub mod cosmic;
pub mod error;
pub mod frame;
pub mod fringe;
pub mod inventory;
pub mod io;
pub mod mask;
pub mod persist;
pub mod pipeline;
pub mod stack;
pub mod stats;
