pub mod batch;
pub mod convert;
pub mod inspect;
pub mod stylize;

pub use self::batch::batch;
pub use self::convert::convert;
pub use self::inspect::inspect;
pub use self::stylize::stylize;
