//! Track store: per-frame assignment, aging and eviction.

use std::collections::{BTreeMap, HashSet};

use tracing::{debug, trace};

use crate::matching::{find_first_match, MatchWindow};
use crate::track::{Track, TrackId, TrackIdFactory};
use crate::{Detection, Error, Result};

/// Default number of unmatched frames a track survives.
pub const DEFAULT_MAX_AGE: u32 = 5;

/// Outcome of one assignment pass.
///
/// Every list is in processing order: `matched` and `created` follow the
/// detection order, `aged` and `evicted` follow track creation order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AssignmentResult {
    /// Existing tracks that absorbed a detection this frame.
    pub matched: Vec<TrackId>,

    /// Tracks created from unmatched detections.
    pub created: Vec<TrackId>,

    /// Tracks that were not touched and had their age incremented.
    pub aged: Vec<TrackId>,

    /// Tracks removed because their age exceeded `max_age`.
    pub evicted: Vec<TrackId>,
}

impl AssignmentResult {
    /// Tracks touched this frame (matched, then created).
    pub fn touched(&self) -> impl Iterator<Item = TrackId> + '_ {
        self.matched.iter().chain(self.created.iter()).copied()
    }
}

/// Owns the set of live tracks.
///
/// Tracks are keyed by id. Ids are allocated in increasing order, so
/// iterating the map visits tracks in creation order.
#[derive(Debug, Clone)]
pub struct TrackStore {
    window: MatchWindow,
    max_age: u32,
    tracks: BTreeMap<TrackId, Track>,
    ids: TrackIdFactory,
}

impl TrackStore {
    /// Create an empty store.
    pub fn new(window: MatchWindow, max_age: u32) -> Result<Self> {
        window.validate()?;

        Ok(Self {
            window,
            max_age,
            tracks: BTreeMap::new(),
            ids: TrackIdFactory::new(),
        })
    }

    /// Assign one frame of detections to tracks.
    ///
    /// Each detection, in input order, takes the first track (in creation
    /// order) that is inside its match window and has not been touched yet
    /// this frame. Detections without a match start new tracks. Untouched
    /// tracks then age by one and tracks older than `max_age` are evicted.
    ///
    /// # Errors
    /// `TrackInvariantViolation` if the store's internal bookkeeping is
    /// inconsistent. This indicates a bug and the store should not be used
    /// further.
    pub fn assign(&mut self, detections: &[Detection]) -> Result<AssignmentResult> {
        let mut result = AssignmentResult::default();
        let mut touched: HashSet<TrackId> = HashSet::with_capacity(detections.len());

        for detection in detections {
            let found = find_first_match(self.tracks.values(), detection, &self.window, |track| {
                !touched.contains(&track.id())
            });

            match found {
                Some(id) => {
                    let track = self.tracks.get_mut(&id).ok_or_else(|| {
                        Error::TrackInvariantViolation(format!("matched track {} is not live", id))
                    })?;
                    track.update_position(detection.centroid());
                    touched.insert(id);
                    result.matched.push(id);
                }
                None => {
                    let id = self.create_track(detection)?;
                    touched.insert(id);
                    result.created.push(id);
                }
            }
        }

        for track in self.tracks.values_mut() {
            if !touched.contains(&track.id()) {
                track.increment_age();
                result.aged.push(track.id());
            }
        }

        // Collect first, remove after the scan
        let expired: Vec<TrackId> = self
            .tracks
            .values()
            .filter(|track| track.is_timed_out())
            .map(Track::id)
            .collect();

        for id in expired {
            if let Some(track) = self.tracks.remove(&id) {
                debug!(track_id = id, age = track.age(), "evicted stale track");
            }
            result.evicted.push(id);
        }

        trace!(
            matched = result.matched.len(),
            created = result.created.len(),
            evicted = result.evicted.len(),
            live = self.tracks.len(),
            "assignment complete"
        );

        Ok(result)
    }

    // Internal: start a new track at the detection centroid
    fn create_track(&mut self, detection: &Detection) -> Result<TrackId> {
        let (id, global_id) = self.ids.next_ids();

        if let Some((&last, _)) = self.tracks.last_key_value() {
            if id <= last {
                return Err(Error::TrackInvariantViolation(format!(
                    "track id {} allocated after live id {}",
                    id, last
                )));
            }
        }

        let track = Track::new(id, global_id, detection.centroid(), self.max_age);
        if self.tracks.insert(id, track).is_some() {
            return Err(Error::TrackInvariantViolation(format!(
                "duplicate track id {}",
                id
            )));
        }

        debug!(track_id = id, x = detection.cx, y = detection.cy, "created track");
        Ok(id)
    }

    /// Live track by id.
    pub fn get(&self, id: TrackId) -> Option<&Track> {
        self.tracks.get(&id)
    }

    pub(crate) fn get_mut(&mut self, id: TrackId) -> Option<&mut Track> {
        self.tracks.get_mut(&id)
    }

    /// Live tracks in creation order.
    pub fn iter(&self) -> impl Iterator<Item = &Track> {
        self.tracks.values()
    }

    /// Number of live tracks.
    pub fn len(&self) -> usize {
        self.tracks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tracks.is_empty()
    }

    /// Total number of tracks ever created by this store.
    pub fn total_track_count(&self) -> u64 {
        self.ids.issued()
    }

    pub fn window(&self) -> &MatchWindow {
        &self.window
    }

    pub fn max_age(&self) -> u32 {
        self.max_age
    }
}
