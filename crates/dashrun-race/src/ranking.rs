use std::cmp::Ordering;

use serde::{Deserialize, Serialize};

use dashrun_core::player::PlayerId;

use crate::racer::Racer;

/// One line of the final standings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RaceResult {
    pub player_id: PlayerId,
    pub display_name: String,
    /// 1-based.
    pub placement: u32,
    pub finished: bool,
    pub finish_time_ms: Option<u64>,
    pub distance: f32,
}

/// Finished racers first by ascending finish time, then unfinished racers by
/// descending distance. Player id breaks ties.
pub fn compare(a: &Racer, b: &Racer) -> Ordering {
    b.finished
        .cmp(&a.finished)
        .then_with(|| match (a.finish_time_ms, b.finish_time_ms) {
            (Some(ta), Some(tb)) if a.finished && b.finished => ta.cmp(&tb),
            _ => Ordering::Equal,
        })
        .then_with(|| {
            if a.finished {
                Ordering::Equal
            } else {
                b.distance.total_cmp(&a.distance)
            }
        })
        .then_with(|| a.id.cmp(&b.id))
}

pub fn rank<'a>(racers: impl IntoIterator<Item = &'a Racer>) -> Vec<RaceResult> {
    let mut sorted: Vec<&Racer> = racers.into_iter().collect();
    sorted.sort_by(|a, b| compare(a, b));
    sorted
        .into_iter()
        .enumerate()
        .map(|(i, r)| RaceResult {
            player_id: r.id,
            display_name: r.display_name.clone(),
            placement: i as u32 + 1,
            finished: r.finished,
            finish_time_ms: r.finish_time_ms,
            distance: r.distance,
        })
        .collect()
}
