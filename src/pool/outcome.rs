use std::fmt::Display;

use log::warn;

use crate::{FeedError, Result};

/// Per-item results of an executed [`Job`](super::Job).
///
/// `results[i]` and `errors[i]` always belong to the job's `inputs[i]`.
/// A failed slot holds `R::default()` alongside its error.
#[derive(Debug)]
pub struct Outcome<R> {
    results: Vec<R>,
    errors: Vec<Option<FeedError>>,
}

impl<R> Outcome<R> {
    /// Creates the outcome of a job with no inputs.
    pub fn empty() -> Self {
        Outcome {
            results: Vec::new(),
            errors: Vec::new(),
        }
    }

    /// Builds an outcome from index-ordered item results.
    pub fn from_slots(slots: Vec<Result<R>>) -> Self
    where
        R: Default,
    {
        let (results, errors) = slots
            .into_iter()
            .map(|slot| match slot {
                Ok(result) => (result, None),
                Err(e) => (R::default(), Some(e)),
            })
            .unzip();
        Outcome { results, errors }
    }

    /// Builds an outcome from slots filled by the workers.
    ///
    /// A slot no worker ever claimed is reported as
    /// [`FeedError::WorkerUnavailable`].
    pub fn from_claimed(slots: Vec<Option<Result<R>>>) -> Self
    where
        R: Default,
    {
        Self::from_slots(
            slots
                .into_iter()
                .enumerate()
                .map(|(index, slot)| slot.unwrap_or(Err(FeedError::WorkerUnavailable(index))))
                .collect(),
        )
    }

    /// Returns the number of items.
    pub fn len(&self) -> usize {
        self.results.len()
    }

    /// Returns true if the job had no inputs.
    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }

    /// Returns the result slots.
    pub fn results(&self) -> &[R] {
        &self.results
    }

    /// Returns the error slots.
    pub fn errors(&self) -> &[Option<FeedError>] {
        &self.errors
    }

    /// Returns the number of failed items.
    pub fn failed(&self) -> usize {
        self.errors.iter().filter(|e| e.is_some()).count()
    }

    /// Classifies the batch, see [`classify`].
    pub fn summary(&self) -> Result<()> {
        classify(self.failed(), self.len())
    }

    /// Splits the outcome into results, errors and the batch summary.
    pub fn into_parts(self) -> (Vec<R>, Vec<Option<FeedError>>, Result<()>) {
        let summary = self.summary();
        (self.results, self.errors, summary)
    }

    /// Keeps the successful results in input order and returns them with
    /// the batch summary.
    ///
    /// Every failed item is logged with its label, taken from `labels` at
    /// the same index.
    pub fn into_successes<L: Display>(self, labels: &[L], feed: &str) -> (Vec<R>, Result<()>) {
        let summary = self.summary();
        let mut successes = Vec::with_capacity(self.len());

        for (index, (result, error)) in self.results.into_iter().zip(self.errors).enumerate() {
            match error {
                None => successes.push(result),
                Some(e) => match labels.get(index) {
                    Some(label) => warn!("failed to fetch {feed} item {label}: {e}"),
                    None => warn!("failed to fetch {feed} item #{index}: {e}"),
                },
            }
        }

        (successes, summary)
    }
}

/// Classifies a batch from its failure count.
///
/// No failures is a success, every item failing is
/// [`FeedError::NoContent`], anything in between is
/// [`FeedError::PartialContent`].
pub fn classify(failed: usize, total: usize) -> Result<()> {
    if failed == 0 {
        Ok(())
    } else if failed >= total {
        Err(FeedError::NoContent)
    } else {
        Err(FeedError::PartialContent { failed })
    }
}
