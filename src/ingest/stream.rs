use tracing::{debug, info, warn};

use crate::core::OhlcvBar;
use crate::error::{ChartError, ChartResult};
use crate::ingest::chunk_reader::{ChunkRead, read_previous, read_tail};
use crate::ingest::resampler::merge_dedup;
use crate::ingest::ChunkSource;

/// Permission to run one backward read, tied to the controller generation it
/// was issued for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoadTicket {
    generation: u64,
    cursor: u64,
}

impl LoadTicket {
    #[must_use]
    pub fn generation(self) -> u64 {
        self.generation
    }

    #[must_use]
    pub fn cursor(self) -> u64 {
        self.cursor
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoadOutcome {
    /// Records that were not already present.
    pub added: usize,
    pub has_more: bool,
}

/// Tail-first loader with serialized backward pagination.
///
/// The merged series is always sorted by time and free of duplicate
/// timestamps. At most one backward load is in flight; results carrying an
/// older generation (the controller was closed or reopened meanwhile) are
/// rejected without touching state.
#[derive(Debug)]
pub struct StreamController<S: ChunkSource> {
    source: S,
    chunk_size: u64,
    cursor: u64,
    leftover: Vec<u8>,
    has_more: bool,
    is_loading: bool,
    generation: u64,
    bars: Vec<OhlcvBar>,
}

impl<S: ChunkSource> StreamController<S> {
    /// Opens `source` by reading its last chunk.
    pub fn open(source: S, chunk_size: u64) -> ChartResult<Self> {
        if chunk_size == 0 {
            return Err(ChartError::InvalidData(
                "chunk size must be > 0".to_owned(),
            ));
        }
        let first = read_tail(&source, chunk_size)?;
        let bars = merge_dedup(&[], &first.records);
        info!(
            source = source.name(),
            records = bars.len(),
            has_more = first.has_more,
            "opened stream"
        );
        Ok(Self {
            source,
            chunk_size,
            cursor: first.cursor,
            leftover: first.leftover,
            has_more: first.has_more,
            is_loading: false,
            generation: 0,
            bars,
        })
    }

    #[must_use]
    pub fn source(&self) -> &S {
        &self.source
    }

    #[must_use]
    pub fn bars(&self) -> &[OhlcvBar] {
        &self.bars
    }

    #[must_use]
    pub fn has_more(&self) -> bool {
        self.has_more
    }

    #[must_use]
    pub fn is_loading(&self) -> bool {
        self.is_loading
    }

    #[must_use]
    pub fn generation(&self) -> u64 {
        self.generation
    }

    #[must_use]
    pub fn cursor(&self) -> u64 {
        self.cursor
    }

    /// Claims the loading slot. Returns `None` when a load is already in
    /// flight or the start of the file has been reached.
    pub fn begin_backward_load(&mut self) -> Option<LoadTicket> {
        if self.is_loading {
            debug!(cursor = self.cursor, "backward load already in flight");
            return None;
        }
        if !self.has_more {
            return None;
        }
        self.is_loading = true;
        Some(LoadTicket {
            generation: self.generation,
            cursor: self.cursor,
        })
    }

    /// Performs the read for `ticket` without mutating the controller.
    pub fn read_for(&self, ticket: LoadTicket) -> ChartResult<ChunkRead> {
        read_previous(&self.source, ticket.cursor, &self.leftover, self.chunk_size)
    }

    /// Applies the result of a backward read.
    ///
    /// On error the loading flag is cleared and everything else, `has_more`
    /// included, is left as it was so the caller may retry.
    pub fn complete_backward_load(
        &mut self,
        ticket: LoadTicket,
        result: ChartResult<ChunkRead>,
    ) -> ChartResult<LoadOutcome> {
        if ticket.generation != self.generation {
            warn!(
                expected = self.generation,
                actual = ticket.generation,
                "discarding stale backward load"
            );
            return Err(ChartError::StaleSession {
                expected: self.generation,
                actual: ticket.generation,
            });
        }
        self.is_loading = false;

        let read = match result {
            Ok(read) => read,
            Err(err) => {
                warn!(error = %err, cursor = self.cursor, "backward load failed");
                return Err(err);
            }
        };

        let before = self.bars.len();
        self.bars = merge_dedup(&self.bars, &read.records);
        self.cursor = read.cursor;
        self.leftover = read.leftover;
        self.has_more = read.has_more;

        let outcome = LoadOutcome {
            added: self.bars.len() - before,
            has_more: self.has_more,
        };
        debug!(
            added = outcome.added,
            total = self.bars.len(),
            cursor = self.cursor,
            has_more = self.has_more,
            "merged backward chunk"
        );
        Ok(outcome)
    }

    /// Runs a full backward load. Returns `Ok(None)` when the request was a
    /// no-op (already loading or nothing left to read).
    pub fn load_previous(&mut self) -> ChartResult<Option<LoadOutcome>> {
        let Some(ticket) = self.begin_backward_load() else {
            return Ok(None);
        };
        let result = self.read_for(ticket);
        self.complete_backward_load(ticket, result).map(Some)
    }

    /// Invalidates in-flight loads and drops the loaded series.
    pub fn close(&mut self) {
        self.generation += 1;
        self.is_loading = false;
        self.has_more = false;
        self.bars.clear();
        self.leftover.clear();
        debug!(generation = self.generation, "closed stream");
    }
}
