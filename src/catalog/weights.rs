use std::fmt::Display;

use rand::Rng;

use crate::error::{AppError, AppResult, ValidationError};

/// Cumulative-weight table resolved with a single uniform draw.
#[derive(Debug, Clone)]
pub struct WeightTable<T> {
    items: Vec<T>,
    weights: Vec<u64>,
    cumulative: Vec<u64>,
    total: u64,
}

impl<T: Display> WeightTable<T> {
    /// Build a table from `(item, weight)` pairs, preserving their order.
    ///
    /// # Errors
    ///
    /// Returns an error when no entries are given, a weight is zero, or the
    /// total overflows.
    pub fn new<I>(entries: I) -> AppResult<Self>
    where
        I: IntoIterator<Item = (T, u64)>,
    {
        let mut items = Vec::new();
        let mut weights = Vec::new();
        let mut cumulative = Vec::new();
        let mut total = 0u64;
        for (item, weight) in entries {
            if weight == 0 {
                return Err(AppError::validation(ValidationError::WeightZero {
                    name: item.to_string(),
                }));
            }
            total = total
                .checked_add(weight)
                .ok_or_else(|| AppError::validation(ValidationError::WeightOverflow))?;
            items.push(item);
            weights.push(weight);
            cumulative.push(total);
        }
        if items.is_empty() {
            return Err(AppError::validation(ValidationError::WeightTableEmpty));
        }
        Ok(Self {
            items,
            weights,
            cumulative,
            total,
        })
    }
}

impl<T> WeightTable<T> {
    /// Map a draw in `[0, total)` to its entry. Draws past the end yield `None`.
    #[must_use]
    pub fn pick(&self, draw: u64) -> Option<&T> {
        let idx = self.cumulative.partition_point(|bound| *bound <= draw);
        self.items.get(idx)
    }

    pub fn choose<R: Rng + ?Sized>(&self, rng: &mut R) -> Option<&T> {
        let draw = rng.gen_range(0..self.total);
        self.pick(draw)
    }

    #[must_use]
    pub const fn total(&self) -> u64 {
        self.total
    }

    pub fn entries(&self) -> impl Iterator<Item = (&T, u64)> {
        self.items.iter().zip(self.weights.iter().copied())
    }
}
