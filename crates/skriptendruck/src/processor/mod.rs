//! PDF handling: inspection, cover sheets, thumbnails and merging.

pub mod coversheet;
pub mod inspect;
pub mod merge;
pub mod thumbnail;

#[cfg(test)]
pub(crate) mod testing;

pub use coversheet::{CoversheetRenderer, Rendered};
pub use inspect::{inspect, Inspection};
pub use merge::merge;
pub use thumbnail::{
    select_thumbnailer, NoThumbnails, PdftoppmThumbnailer, Thumbnail, ThumbnailRenderer,
};
