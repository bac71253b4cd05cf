mod base;
mod flags;
mod kubernetes;
mod launcher;
mod scripts;
mod sentry;

pub use base::*;
pub use flags::*;
pub use kubernetes::*;
pub use launcher::*;
pub use scripts::*;
pub use sentry::*;
