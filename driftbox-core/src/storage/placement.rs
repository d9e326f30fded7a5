use super::record::Tier;

/// Admission-time tier decision.
///
/// A blob goes to memory only when it fits in what is left of the budget.
/// Existing blobs are never displaced, and the decision is never revisited.
pub fn choose_placement(candidate_size: u64, current_memory_usage: u64, memory_budget: u64) -> Tier {
    match current_memory_usage.checked_add(candidate_size) {
        Some(total) if total <= memory_budget => Tier::Memory,
        _ => Tier::Disk,
    }
}
