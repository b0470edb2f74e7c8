pub mod bmd;
pub mod clipboard;
pub mod logging;
