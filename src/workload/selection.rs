use crate::core::error::{SimError, SimResult};
use crate::core::process::ProcessContext;
use crate::core::types::FacilityId;

/// Pick the machine with the shortest wait queue.
///
/// Only queue lengths are compared, so a busy machine with an empty queue is as good as an
/// idle one. Ties go to the machine listed first.
pub fn shortest_queue(ctx: &ProcessContext<'_>, machines: &[FacilityId]) -> SimResult<FacilityId> {
    let lengths = machines
        .iter()
        .map(|&machine| ctx.queue_len(machine))
        .collect::<SimResult<Vec<usize>>>()?;
    pick_shortest(machines, &lengths)
}

pub(crate) fn pick_shortest(machines: &[FacilityId], lengths: &[usize]) -> SimResult<FacilityId> {
    let mut best: Option<(FacilityId, usize)> = None;
    for (&machine, &len) in machines.iter().zip(lengths) {
        match best {
            Some((_, best_len)) if len >= best_len => {}
            _ => best = Some((machine, len)),
        }
    }
    best.map(|(machine, _)| machine)
        .ok_or_else(|| SimError::UnknownResource("empty machine group".to_string()))
}
