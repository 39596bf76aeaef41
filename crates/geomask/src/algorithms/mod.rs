pub mod contour;
pub mod marching_squares;
pub mod simplification;

pub use contour::*;
pub use marching_squares::*;
pub use simplification::*;
