use tracing::info;
use wormhole_core::{ReadRepository, StorageError};
use wormhole_generator::SeqGenerator;

/// Moves `generator` past the codes an earlier run already handed out.
///
/// Earlier runs are assumed to share the generator's settings, so the taken
/// codes form one run starting at the current position. A gallop followed by
/// a binary search finds the first free counter value in `O(log n)` calls to
/// `exists`. A hole left by a deleted code may be skipped; it is never
/// handed out twice.
pub async fn resume_sequence<R>(
    generator: &SeqGenerator,
    repository: &R,
) -> Result<u64, StorageError>
where
    R: ReadRepository + ?Sized,
{
    let start = generator.position();
    if !repository.exists(&generator.code_at(start)).await? {
        return Ok(start);
    }

    let mut taken = start;
    let mut step = 1u64;
    let mut free = loop {
        let candidate = start.saturating_add(step);
        if candidate == taken {
            break candidate;
        }
        if !repository.exists(&generator.code_at(candidate)).await? {
            break candidate;
        }
        taken = candidate;
        step = step.saturating_mul(2);
    };

    while free - taken > 1 {
        let mid = taken + (free - taken) / 2;
        if repository.exists(&generator.code_at(mid)).await? {
            taken = mid;
        } else {
            free = mid;
        }
    }

    generator.advance_to(free);
    info!(from = start, to = free, "resumed code sequence");
    Ok(free)
}
