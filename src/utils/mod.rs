pub mod clock;
pub mod dir;
pub mod hostname;
pub mod logging;
pub mod runtime;
