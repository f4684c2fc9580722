pub mod filesystem;
pub mod layout;
pub mod router;

pub use filesystem::FileStorage;
pub use layout::{relative_destination, OutputLayout};
pub use router::DestinationRouter;
