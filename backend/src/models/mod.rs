pub mod answer;
pub mod metric;
pub mod video;

pub use answer::*;
pub use metric::*;
pub use video::*;
