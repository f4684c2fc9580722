use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// One ring-binding size and the fee charged for it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RingSize {
    pub size_mm: u32,
    /// Largest page count this ring can hold.
    pub max_pages: u32,
    pub price_cents: u64,
}

/// Validated ring-size table, sorted ascending by size.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PriceTable {
    ring_sizes: Vec<RingSize>,
}

#[derive(Deserialize)]
struct PriceTableFile {
    ring_sizes: Vec<RingSize>,
}

impl PriceTable {
    /// Validates and sorts `ring_sizes`. `reason` errors are wrapped by the caller.
    pub fn new(mut ring_sizes: Vec<RingSize>) -> Result<Self, String> {
        if ring_sizes.is_empty() {
            return Err("ring size table is empty".to_string());
        }

        ring_sizes.sort_by_key(|r| r.size_mm);

        for pair in ring_sizes.windows(2) {
            let (smaller, larger) = (&pair[0], &pair[1]);
            if smaller.size_mm == larger.size_mm {
                return Err(format!("duplicate ring size {} mm", smaller.size_mm));
            }
            if larger.price_cents < smaller.price_cents {
                return Err(format!(
                    "ring price decreases from {} mm to {} mm",
                    smaller.size_mm, larger.size_mm
                ));
            }
        }

        if let Some(zero) = ring_sizes.iter().find(|r| r.size_mm == 0) {
            return Err(format!("ring size must be positive, got {} mm", zero.size_mm));
        }

        Ok(Self { ring_sizes })
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadFile {
            path: path.to_path_buf(),
            source: e,
        })?;

        let file: PriceTableFile =
            serde_json::from_str(&content).map_err(|e| ConfigError::PriceTable {
                path: path.to_path_buf(),
                reason: e.to_string(),
            })?;

        Self::new(file.ring_sizes).map_err(|reason| ConfigError::PriceTable {
            path: path.to_path_buf(),
            reason,
        })
    }

    pub fn ring_sizes(&self) -> &[RingSize] {
        &self.ring_sizes
    }

    /// Smallest ring that holds `page_count` pages, else the largest ring.
    pub fn ring_for_pages(&self, page_count: u32) -> &RingSize {
        self.ring_sizes
            .iter()
            .find(|r| r.max_pages >= page_count)
            .unwrap_or_else(|| self.largest())
    }

    /// Exact match, otherwise the nearest configured size. Ties go to the larger ring.
    pub fn ring_for_size(&self, size_mm: u32) -> &RingSize {
        let mut best = self.largest();
        let mut best_distance = u32::MAX;

        // Ascending order plus `<=` makes the later (larger) ring win a tie.
        for ring in &self.ring_sizes {
            let distance = ring.size_mm.abs_diff(size_mm);
            if distance <= best_distance {
                best = ring;
                best_distance = distance;
            }
            if ring.size_mm > size_mm && distance > best_distance {
                break;
            }
        }

        best
    }

    fn largest(&self) -> &RingSize {
        // Construction rejects empty tables.
        &self.ring_sizes[self.ring_sizes.len() - 1]
    }
}

impl Default for PriceTable {
    fn default() -> Self {
        let ring_sizes = [
            (6, 30, 150),
            (8, 50, 175),
            (10, 70, 200),
            (12, 90, 225),
            (14, 110, 250),
            (16, 130, 275),
            (19, 160, 300),
            (22, 190, 325),
            (25, 220, 350),
            (28, 250, 375),
            (32, 290, 400),
            (38, 350, 450),
            (45, 420, 500),
            (51, 500, 550),
        ]
        .into_iter()
        .map(|(size_mm, max_pages, price_cents)| RingSize {
            size_mm,
            max_pages,
            price_cents,
        })
        .collect();

        Self { ring_sizes }
    }
}
