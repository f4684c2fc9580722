use std::path::Path;

use tracing::{debug, warn};

use crate::error::StorageError;
use crate::logging::file_label;
use crate::order::{Order, OrderStatus};
use crate::storage::{FileStorage, OutputLayout};

/// Places a terminal order's files in the output tree.
#[derive(Debug, Clone)]
pub struct DestinationRouter {
    layout: OutputLayout,
    storage: FileStorage,
}

impl DestinationRouter {
    pub fn new(layout: OutputLayout) -> Self {
        Self {
            layout,
            storage: FileStorage::new(),
        }
    }

    pub fn layout(&self) -> &OutputLayout {
        &self.layout
    }

    pub fn storage(&self) -> &FileStorage {
        &self.storage
    }

    /// Moves the order's files to where its status says they belong.
    ///
    /// With a `deliverable`, the source is archived in `originals/` first and
    /// only then is the deliverable placed in the status directory. Without
    /// one, the source itself goes to the status directory; `archive_copy`
    /// additionally leaves a copy in `originals/`.
    ///
    /// If either half of the deliverable route fails the deliverable is
    /// discarded, a successful order becomes `ERROR_OTHER`, and the source is
    /// routed as if no deliverable existed. Errors returned here mean the
    /// source could not be placed at all.
    pub fn route(
        &self,
        order: &mut Order,
        deliverable: Option<&Path>,
        archive_copy: bool,
    ) -> Result<(), StorageError> {
        let name = order.destination_filename();
        let mut archived = None;

        if let Some(deliverable) = deliverable {
            match self
                .storage
                .move_into(&order.filepath, &self.layout.originals(), &name)
            {
                Ok(archive) => {
                    let destination = self.layout.destination(order.status, order.color_mode);
                    match self.storage.move_into(deliverable, &destination, &name) {
                        Ok(stored) => {
                            debug!("Stored deliverable {}", file_label(&stored));
                            order.archive_path = Some(archive);
                            order.output_path = Some(stored);
                            return Ok(());
                        }
                        Err(e) => {
                            archived = Some(archive);
                            discard_deliverable(
                                order,
                                deliverable,
                                format!("Deliverable could not be stored: {}", e),
                            );
                        }
                    }
                }
                Err(e) => discard_deliverable(
                    order,
                    deliverable,
                    format!("Original could not be archived: {}", e),
                ),
            }
        }

        let destination = self.layout.destination(order.status, order.color_mode);

        // The source already sits in originals/; the status directory gets a copy.
        if let Some(archive) = archived {
            let copied = self.storage.copy_into(&archive, &destination, &name)?;
            debug!("Routed archived source to {}", file_label(&copied));
            order.archive_path = Some(archive);
            order.output_path = Some(copied);
            return Ok(());
        }

        if archive_copy {
            match self
                .storage
                .copy_into(&order.filepath, &self.layout.originals(), &name)
            {
                Ok(copy) => order.archive_path = Some(copy),
                Err(e) => {
                    warn!("Failed to archive order {}: {}", order.order_id, e);
                    order.add_warning(format!("Original could not be archived: {}", e));
                }
            }
        }

        let moved = self.storage.move_into(&order.filepath, &destination, &name)?;
        debug!("Routed source to {}", file_label(&moved));
        order.output_path = Some(moved);
        Ok(())
    }
}

/// Deletes an unrouted deliverable and records why on the order.
fn discard_deliverable(order: &mut Order, deliverable: &Path, message: String) {
    warn!("Order {}: {}", order.order_id, message);
    let _ = std::fs::remove_file(deliverable);

    if order.is_error() {
        order.add_warning(message);
    } else {
        order.fail(OrderStatus::ErrorOther, message);
    }
}
