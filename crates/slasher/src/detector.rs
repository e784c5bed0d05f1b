use aegis_storage::{ProtectionStore, StoreError};
use aegis_types::{
    ShortRoot,
    primitives::{Epoch, H256, ValidatorIndex},
    record::{SignedAttestationRecord, roots_match},
    span::{EpochSpan, HISTORY_WINDOW_EPOCHS},
};
use thiserror::Error;
use tracing::warn;

use crate::cache::SpanCache;
use crate::metrics;

/// Slasher configuration.
#[derive(Debug, Clone)]
pub struct SlasherConfig {
    /// Maximum number of validators whose span maps stay resident in memory.
    pub span_cache_size: usize,
}

impl Default for SlasherConfig {
    fn default() -> Self {
        Self {
            span_cache_size: 1000,
        }
    }
}

/// The class of slashable behavior an ingested attestation exposed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OffenseKind {
    /// Two attestations for the same target epoch with different roots.
    DoubleVote,
    /// The observed attestation's range strictly contains an earlier one's.
    SurroundingVote,
    /// The observed attestation's range is strictly contained by an earlier one's.
    SurroundedVote,
}

impl OffenseKind {
    /// Returns a string label for metrics and logging.
    pub fn as_str(&self) -> &'static str {
        match self {
            OffenseKind::DoubleVote => "double_vote",
            OffenseKind::SurroundingVote => "surrounding_vote",
            OffenseKind::SurroundedVote => "surrounded_vote",
        }
    }
}

/// Proof material for one detected violation: the offender plus both
/// conflicting attestations with their signing roots.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SlashableOffense {
    pub validator_index: ValidatorIndex,
    pub kind: OffenseKind,
    pub prior: SignedAttestationRecord,
    pub observed: SignedAttestationRecord,
}

/// Result of ingesting one broadcast attestation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IngestOutcome {
    /// New history recorded, spans tightened, nothing slashable.
    Recorded,
    /// The identical attestation was already ingested; nothing to do.
    AlreadyKnown,
    /// A violation was detected and is reported to the caller. The detector
    /// only observes; it does not stop the broadcast.
    Slashable(SlashableOffense),
}

#[derive(Debug, Error)]
pub enum IngestError {
    #[error("attestation source epoch {source} is after its target epoch {target}")]
    SourceExceedsTarget { source: Epoch, target: Epoch },
    #[error(
        "attestation spans {distance} epochs, beyond the {window}-epoch tracking window",
        window = HISTORY_WINDOW_EPOCHS
    )]
    DistanceOverflow { distance: u64 },
    #[error(
        "span summary flags a conflict but no matching attestation is recorded \
         for validator {validator_index}"
    )]
    InconsistentHistory { validator_index: ValidatorIndex },
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Cross-validator surround/double-vote detector over compressed spans.
///
/// Per attestation the hot path touches the span summary at the source epoch
/// plus the epochs whose spans actually tighten, never the full history; the
/// raw history table is only consulted to re-derive the concrete conflicting
/// attestation once a span flags one, and to answer double-vote lookups at a
/// single target.
pub struct SpanDetector {
    store: ProtectionStore,
    cache: SpanCache,
}

impl SpanDetector {
    pub fn new(store: ProtectionStore, config: SlasherConfig) -> Self {
        Self {
            store,
            cache: SpanCache::new(config.span_cache_size),
        }
    }

    /// Ingest one attestation observed on the network.
    pub fn ingest_attestation(
        &self,
        validator_index: ValidatorIndex,
        source: Epoch,
        target: Epoch,
        signing_root: H256,
    ) -> Result<IngestOutcome, IngestError> {
        let _timer = metrics::ingest_timer();
        metrics::inc_attestations_ingested();

        if source > target {
            return Err(IngestError::SourceExceedsTarget { source, target });
        }
        let distance = target - source;
        if distance > HISTORY_WINDOW_EPOCHS {
            return Err(IngestError::DistanceOverflow { distance });
        }

        let observed = SignedAttestationRecord {
            source,
            target,
            signing_root,
        };

        // Double votes are visible from the single record at the target, no
        // spans needed. The prior record is kept as-is: overwriting it would
        // destroy the evidence.
        if let Some(prior) = self
            .store
            .indexed_attestation_at_target(validator_index, target)?
        {
            if prior.source == source && roots_match(&prior.signing_root, &signing_root) {
                return Ok(IngestOutcome::AlreadyKnown);
            }
            return Ok(self.report(SlashableOffense {
                validator_index,
                kind: OffenseKind::DoubleVote,
                prior,
                observed,
            }));
        }

        // Check the span summary at the source epoch, then tighten the spans
        // the new attestation passes over. Both happen on the cached map; the
        // store write below is what makes them durable.
        let (flagged, dirty) = self.cache.with_spans(
            validator_index,
            || self.store.spans_for_validator(validator_index),
            |spans| {
                let at_source = spans.get(&source).copied().unwrap_or_default();
                let distance = distance as u16;

                let flagged = if at_source.min_span > 0 && at_source.min_span < distance {
                    // Some later-sourced attestation ends before this target:
                    // the observed attestation surrounds it.
                    Some(OffenseKind::SurroundingVote)
                } else if at_source.max_span > distance {
                    // Some earlier-sourced attestation ends past this target:
                    // the observed attestation is surrounded.
                    Some(OffenseKind::SurroundedVote)
                } else {
                    None
                };

                let mut dirty: Vec<(Epoch, EpochSpan)> = Vec::new();

                // Tighten min spans at earlier epochs. Walk backwards and stop
                // at the first epoch that is already at least as tight; prior
                // updates guarantee everything before it is tight as well.
                let floor = target.saturating_sub(HISTORY_WINDOW_EPOCHS);
                let mut epoch = source;
                while epoch > floor {
                    epoch -= 1;
                    let new_span = (target - epoch) as u16;
                    let mut span = spans.get(&epoch).copied().unwrap_or_default();
                    if span.min_span == 0 || new_span < span.min_span {
                        span.min_span = new_span;
                        spans.insert(epoch, span);
                        dirty.push((epoch, span));
                    } else {
                        break;
                    }
                }

                // Widen max spans at the epochs the attestation passes over,
                // with the mirrored early stop.
                for epoch in (source + 1)..target {
                    let new_span = (target - epoch) as u16;
                    let mut span = spans.get(&epoch).copied().unwrap_or_default();
                    if new_span > span.max_span {
                        span.max_span = new_span;
                        spans.insert(epoch, span);
                        dirty.push((epoch, span));
                    } else {
                        break;
                    }
                }

                (flagged, dirty)
            },
        )?;

        // One atomic batch for the record and its span updates. If it fails
        // the cached map is ahead of the store and gets thrown away.
        if let Err(err) =
            self.store
                .commit_attestation_with_spans(validator_index, observed, &dirty)
        {
            self.cache.invalidate(validator_index);
            return Err(err.into());
        }

        let Some(kind) = flagged else {
            return Ok(IngestOutcome::Recorded);
        };

        // Spans are lossy: they prove a conflict exists but not which
        // attestation it is. Pull the concrete record back out of history.
        let history = self.store.indexed_attestations(validator_index)?;
        let prior = match kind {
            OffenseKind::SurroundingVote => {
                history.into_iter().find(|prior| observed.surrounds(prior))
            }
            OffenseKind::SurroundedVote => {
                history.into_iter().find(|prior| prior.surrounds(&observed))
            }
            OffenseKind::DoubleVote => None,
        };
        let Some(prior) = prior else {
            return Err(IngestError::InconsistentHistory { validator_index });
        };

        Ok(self.report(SlashableOffense {
            validator_index,
            kind,
            prior,
            observed,
        }))
    }

    fn report(&self, offense: SlashableOffense) -> IngestOutcome {
        metrics::inc_offenses_detected(offense.kind.as_str());
        warn!(
            validator_index = offense.validator_index,
            kind = offense.kind.as_str(),
            prior_source = offense.prior.source,
            prior_target = offense.prior.target,
            prior_root = %ShortRoot(&offense.prior.signing_root),
            observed_source = offense.observed.source,
            observed_target = offense.observed.target,
            observed_root = %ShortRoot(&offense.observed.signing_root),
            "Detected slashable attestation"
        );
        IngestOutcome::Slashable(offense)
    }
}
