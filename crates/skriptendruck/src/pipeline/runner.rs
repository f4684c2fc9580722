use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

use tempfile::TempPath;
use tracing::{debug, error, info_span, warn};

use crate::config::AmbiguousMatchPolicy;
use crate::filename::{parse_filename, ParsedFilename};
use crate::identity::Resolution;
use crate::logging::file_label;
use crate::order::{Order, OrderStatus};
use crate::processor;

use super::config::PipelineConfig;
use super::error::PipelineError;
use super::progress::{ProgressEvent, ProgressReporter, Stage};

/// Files produced for an order before routing.
#[derive(Default)]
struct Artifacts {
    /// The document was read successfully, so the source is worth archiving.
    inspected: bool,
    /// Cover sheet merged with the document. Deleted on drop unless routed.
    deliverable: Option<TempPath>,
}

pub struct Pipeline {
    config: Arc<PipelineConfig>,
}

impl Pipeline {
    pub fn from_config(config: Arc<PipelineConfig>) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Runs one order to a terminal status and routes its files.
    ///
    /// Never fails: stage errors and panics become error statuses on the
    /// returned order.
    pub fn run(&self, mut order: Order, progress: &dyn ProgressReporter) -> Order {
        let filename = file_label(&order.filepath).into_owned();
        let _order_span = info_span!("order",
            order_id = order.order_id,
            filename = %filename,
        )
        .entered();

        let mut artifacts = Artifacts::default();

        let advanced = panic::catch_unwind(AssertUnwindSafe(|| {
            self.advance(&mut order, &mut artifacts, progress)
        }));
        if let Err(payload) = advanced {
            let message = panic_message(payload.as_ref());
            error!("Order {} panicked: {}", order.order_id, message);
            artifacts.deliverable = None;
            order.fail(
                OrderStatus::ErrorOther,
                PipelineError::Panic(message).to_string(),
            );
        }

        {
            let _step = info_span!("route").entered();
            progress.report(ProgressEvent::Stage {
                order_id: order.order_id,
                stage: Stage::Route,
            });
            let routed = panic::catch_unwind(AssertUnwindSafe(|| {
                self.step_route(&mut order, &artifacts)
            }));
            if let Err(payload) = routed {
                let message = panic_message(payload.as_ref());
                error!("Routing order {} panicked: {}", order.order_id, message);
                if !order.is_error() {
                    order.fail(
                        OrderStatus::ErrorOther,
                        PipelineError::Panic(message).to_string(),
                    );
                }
            }
        }

        progress.report(ProgressEvent::Finished {
            order_id: order.order_id,
            status: order.status,
        });
        order
    }

    /// Runs the stages and records the outcome on the order. The first
    /// failing stage decides the status.
    fn advance(&self, order: &mut Order, artifacts: &mut Artifacts, progress: &dyn ProgressReporter) {
        match self.execute(order, artifacts, progress) {
            Ok(()) => order.mark_processed(),
            Err(e) => {
                let status = e.status();
                debug!("Order {} stopped: {}", order.order_id, status);
                if status == OrderStatus::ManualReview {
                    order.send_to_review(e.to_string());
                } else {
                    order.fail(status, e.to_string());
                }

                if status == OrderStatus::ErrorInvalidFilename
                    && self.config.invalid_filename_notice
                {
                    self.step_notice(order, artifacts);
                }
            }
        }
    }

    fn execute(
        &self,
        order: &mut Order,
        artifacts: &mut Artifacts,
        progress: &dyn ProgressReporter,
    ) -> Result<(), PipelineError> {
        let order_id = order.order_id;
        let enter = |stage: Stage| progress.report(ProgressEvent::Stage { order_id, stage });

        // Step 1: Parse filename
        let parsed = {
            let _step = info_span!("parse").entered();
            enter(Stage::Parse);
            self.step_parse(order)?
        };

        // Step 2: Resolve identity
        {
            let _step = info_span!("identity").entered();
            enter(Stage::Identity);
            self.step_identity(order, &parsed.username)?;
        }

        // Step 3: Inspect document
        let page_count = {
            let _step = info_span!("inspect").entered();
            enter(Stage::Inspect);
            self.step_inspect(order, artifacts)?
        };

        // Step 4: Price
        {
            let _step = info_span!("price").entered();
            enter(Stage::Price);
            self.step_price(order, &parsed, page_count);
        }

        // Step 5: Cover sheet and merge
        {
            let _step = info_span!("render_and_merge").entered();
            enter(Stage::Render);
            let cover = self.step_render(order)?;
            enter(Stage::Merge);
            artifacts.deliverable = Some(self.step_merge(order, &cover)?);
        }

        Ok(())
    }

    fn step_parse(&self, order: &mut Order) -> Result<ParsedFilename, PipelineError> {
        let parsed = parse_filename(&order.filename)?;
        order.apply_parsed(&parsed);
        Ok(parsed)
    }

    fn step_identity(&self, order: &mut Order, username: &str) -> Result<(), PipelineError> {
        match self.config.identity.resolve(username) {
            Resolution::Resolved(identity) => {
                order.attach_user(identity);
                Ok(())
            }
            Resolution::NotFound => Err(PipelineError::UserNotFound(username.to_string())),
            Resolution::Blocked => Err(PipelineError::Blocked(username.to_string())),
            Resolution::Ambiguous(mut candidates) => match self.config.ambiguous_match {
                AmbiguousMatchPolicy::FirstMatch if !candidates.is_empty() => {
                    debug!(
                        "Using first of {} matches for {}",
                        candidates.len(),
                        username
                    );
                    order.attach_user(candidates.swap_remove(0));
                    Ok(())
                }
                AmbiguousMatchPolicy::FirstMatch => {
                    Err(PipelineError::UserNotFound(username.to_string()))
                }
                AmbiguousMatchPolicy::ManualReview => Err(PipelineError::Ambiguous {
                    username: username.to_string(),
                    candidates: candidates.len(),
                }),
            },
        }
    }

    fn step_inspect(&self, order: &mut Order, artifacts: &mut Artifacts) -> Result<u32, PipelineError> {
        let inspection = processor::inspect(&order.filepath)?;
        artifacts.inspected = true;

        let pages = match inspection.page_count {
            Some(pages) if !inspection.encrypted => pages,
            _ => return Err(PipelineError::PasswordProtected),
        };
        order.page_count = Some(pages);

        if pages < self.config.min_pages {
            return Err(PipelineError::TooFewPages {
                pages,
                min: self.config.min_pages,
            });
        }
        if pages > self.config.max_pages {
            return Err(PipelineError::TooManyPages {
                pages,
                max: self.config.max_pages,
            });
        }
        Ok(pages)
    }

    fn step_price(&self, order: &mut Order, parsed: &ParsedFilename, page_count: u32) {
        let calculation = self.config.pricing.price(
            page_count,
            parsed.color_mode,
            parsed.binding_type,
            parsed.binding_size_mm,
        );
        debug!(
            "Order {} costs {} after deposit",
            order.order_id,
            calculation.price_after_deposit_formatted()
        );
        // Record the ring size that was actually priced.
        order.binding_size_mm = calculation.binding_size_mm;
        order.price_calculation = Some(calculation);
    }

    fn step_render(&self, order: &mut Order) -> Result<TempPath, PipelineError> {
        let cover = self.work_file(order, "cover")?;
        let rendered = self.config.coversheet.render(order, &cover)?;
        for warning in rendered.warnings {
            order.add_warning(format!("Thumbnail unavailable: {}", warning));
        }
        Ok(cover)
    }

    fn step_merge(&self, order: &Order, cover: &TempPath) -> Result<TempPath, PipelineError> {
        let merged = self.work_file(order, "merged")?;
        processor::merge(
            cover,
            &order.filepath,
            &merged,
            self.config.insert_blank_page,
        )?;
        Ok(merged)
    }

    /// Best-effort deliverable for a misnamed file: the cover sheet carries
    /// the naming convention so the customer can resubmit.
    fn step_notice(&self, order: &mut Order, artifacts: &mut Artifacts) {
        let _step = info_span!("notice").entered();

        let result = (|| -> Result<TempPath, PipelineError> {
            let inspection = processor::inspect(&order.filepath)?;
            artifacts.inspected = true;
            if inspection.encrypted {
                return Err(PipelineError::PasswordProtected);
            }
            order.page_count = inspection.page_count;
            let cover = self.step_render(order)?;
            self.step_merge(order, &cover)
        })();

        match result {
            Ok(deliverable) => artifacts.deliverable = Some(deliverable),
            Err(e) => {
                warn!("No notice for order {}: {}", order.order_id, e);
                order.add_warning(format!("Notice could not be produced: {}", e));
            }
        }
    }

    fn step_route(&self, order: &mut Order, artifacts: &Artifacts) {
        let deliverable = artifacts.deliverable.as_deref();
        if let Err(e) = self
            .config
            .router
            .route(order, deliverable, artifacts.inspected)
        {
            error!("Failed to route order {}: {}", order.order_id, e);
            if order.is_error() {
                order.add_warning(format!("Routing failed: {}", e));
            } else {
                order.fail(OrderStatus::ErrorOther, PipelineError::from(e).to_string());
            }
        }
    }

    fn work_file(&self, order: &Order, kind: &str) -> Result<TempPath, PipelineError> {
        tempfile::Builder::new()
            .prefix(&format!("{:04}-{}-", order.order_id, kind))
            .suffix(".pdf")
            .tempfile_in(self.config.layout().work())
            .map(|file| file.into_temp_path())
            .map_err(PipelineError::WorkFile)
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    payload
        .downcast_ref::<&str>()
        .map(|s| s.to_string())
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "unknown panic".to_string())
}
