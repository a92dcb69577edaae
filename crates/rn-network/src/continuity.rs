//! Lane-continuity resolution: wire each Lane to the Lanes that follow it.
//!
//! Planning and applying are split.  [`connect_section_elements`] only
//! reads the two CrossSections and returns the element bindings and Lane
//! pairs it would create, or the first error; the caller applies the plan
//! once every part of it is known to be valid.

use tracing::debug;

use crate::lane::{ElementKey, Lane, LaneKey, LaneRef, SectionKey};
use crate::link::{Link, LinkState};
use crate::section::CrossSection;
use crate::{NetworkError, NetworkResult};

/// An element bound to its counterpart in the following CrossSection,
/// with the Lane pairs between them.
#[derive(Clone, Debug, PartialEq)]
pub struct ElementLink {
    pub from:  ElementKey,
    pub to:    ElementKey,
    pub lanes: Vec<(LaneKey, LaneKey)>,
}

/// Pair the Lanes of an element with the Lanes of its counterpart.
///
/// With equal Lane counts the pairing is by index, which also absorbs a
/// lateral jump between the two elements.  Otherwise every earlier Lane
/// continues into the later Lane it overlaps most (nearest centre when
/// nothing overlaps), and every later Lane that got no feeder is fed by the
/// earlier Lane that overlaps it most.  Ties go to the leftmost candidate.
pub fn pair_lanes(earlier: &[Lane], later: &[Lane]) -> Vec<(usize, usize)> {
    if earlier.is_empty() || later.is_empty() {
        return Vec::new();
    }
    if earlier.len() == later.len() {
        return (0..earlier.len()).map(|i| (i, i)).collect();
    }

    let mut pairs: Vec<(usize, usize)> = earlier
        .iter()
        .enumerate()
        .filter_map(|(i, lane)| best_match(lane, later).map(|j| (i, j)))
        .collect();

    for (j, lane) in later.iter().enumerate() {
        if pairs.iter().any(|&(_, b)| b == j) {
            continue;
        }
        if let Some(i) = best_match(lane, earlier) {
            pairs.push((i, j));
        }
    }

    pairs.sort_unstable();
    pairs
}

fn best_match(lane: &Lane, candidates: &[Lane]) -> Option<usize> {
    candidates
        .iter()
        .enumerate()
        .min_by(|(_, a), (_, b)| {
            b.overlap(lane)
                .total_cmp(&a.overlap(lane))
                .then_with(|| {
                    (a.centre() - lane.centre()).abs().total_cmp(&(b.centre() - lane.centre()).abs())
                })
        })
        .map(|(i, _)| i)
}

/// Plan the element bindings between two successive CrossSections.
///
/// Every drivable element of `earlier` with a neighbor index is bound to
/// that element of `later`.  Elements without a neighbor index are skipped:
/// not every drivable element continues (a lane may end here).  A neighbor
/// index past the end of `later` is an error.
pub fn connect_section_elements(
    link_name:   &str,
    earlier:     &CrossSection,
    earlier_key: SectionKey,
    later:       &CrossSection,
    later_key:   SectionKey,
) -> NetworkResult<Vec<ElementLink>> {
    let mut plan = Vec::new();

    for (e, cse) in earlier.elements().iter().enumerate() {
        if !cse.is_drivable() {
            continue;
        }
        let Some(neighbor) = cse.neighbor() else {
            continue;
        };
        let target = later.elements().get(neighbor).ok_or_else(|| NetworkError::NeighborOutOfRange {
            link:      link_name.to_owned(),
            section:   earlier_key.section,
            element:   e,
            neighbor,
            available: later.elements().len(),
        })?;

        let from = ElementKey { link: earlier_key.link, section: earlier_key.section, element: e };
        let to = ElementKey { link: later_key.link, section: later_key.section, element: neighbor };
        let lanes = pair_lanes(cse.lanes(), target.lanes())
            .into_iter()
            .map(|(a, b)| (from.lane(a), to.lane(b)))
            .collect();
        plan.push(ElementLink { from, to, lanes });
    }

    Ok(plan)
}

impl Link {
    /// Link the elements and Lanes of each pair of successive CrossSections
    /// of this Link.  Nothing is changed if any pair fails to plan.
    pub fn connect_successive_lanes_at_link(&mut self) -> NetworkResult<()> {
        let mut plan = Vec::new();
        for s in 1..self.cross_sections.len() {
            plan.extend(connect_section_elements(
                &self.name,
                &self.cross_sections[s - 1],
                SectionKey { link: self.id, section: s - 1 },
                &self.cross_sections[s],
                SectionKey { link: self.id, section: s },
            )?);
        }

        for s in 1..self.cross_sections.len() {
            self.cross_sections[s - 1].set_successor(SectionKey { link: self.id, section: s });
            self.cross_sections[s].set_predecessor(SectionKey { link: self.id, section: s - 1 });
        }

        let mut edges = 0;
        for el in plan {
            if let Some(cse) = self.element_mut(el.from) {
                cse.set_successor(el.to);
            }
            if let Some(cse) = self.element_mut(el.to) {
                cse.add_predecessor(el.from);
            }
            for (a, b) in el.lanes {
                if let Some(lane) = self.lane_mut(a) {
                    lane.add_down(LaneRef::Link(b));
                }
                if let Some(lane) = self.lane_mut(b) {
                    lane.add_up(LaneRef::Link(a));
                }
                edges += 1;
            }
        }

        self.state = LinkState::LinkedWithinLink;
        debug!(link = %self.name, edges, "linked successive cross-sections");
        Ok(())
    }
}
