pub mod buffer;
pub mod dark;
pub mod io;
pub mod traits;

pub use self::buffer::{Image, ImageC64, ImageF64};
pub use self::dark::{subtract_dark, DarkCorrection};
pub use self::traits::{ImageView, Rows};
