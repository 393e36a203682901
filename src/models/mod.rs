mod command_logs;
mod devices;
mod onts;
mod topology;

pub use command_logs::*;
pub use devices::*;
pub use onts::*;
pub use topology::*;
