mod provision;
mod rollback;
mod validators;

pub use provision::*;
pub use rollback::*;
pub use validators::*;
