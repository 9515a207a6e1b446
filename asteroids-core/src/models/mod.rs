pub mod coordinates;
pub mod raf;
pub mod region;

// re-export for cleaner imports
pub use self::coordinates::{CoordinateSpace, Direction, SequenceSource};
pub use self::raf::{Raf, RafSlot, ResidueToken};
pub use self::region::Region;
