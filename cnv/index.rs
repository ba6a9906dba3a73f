// ========================================================================================
//                      Per-patient chromosome indexes & point queries
// ========================================================================================
//
// The heart of the tool. A cohort's segments (patients interleaved) are
// grouped into one index per (patient, chromosome); each index answers "which
// segments cover position P" in logarithmic time over a few thousand
// intervals. Overlapping calls are preserved as-is: the index is a multiset,
// and disagreement between calls surfaces at query time as an explicit
// `Ambiguous` outcome.
//
// Segment ranges are closed (`end` is a covered position) while the
// underlying interval list is half-open, so insertion stores `[start, end+1)`.

use ahash::AHashMap;
use itertools::Itertools;
use rust_lapper::{Interval, Lapper};

use crate::types::{CHROMOSOME_SLOTS, Covering, QueryResult, Segment};

/// Read-only interval index for one (patient, chromosome) pair.
///
/// Interval payloads index into `values`: the interval list requires `Eq`
/// payloads, which copy-number means are not.
pub struct ChromosomeIndex {
    intervals: Lapper<u64, usize>,
    values: Vec<f64>,
}

impl ChromosomeIndex {
    /// Resolves a point query. Exactly one covering segment yields its value;
    /// zero yields `Missing`; two or more yield `Ambiguous` with every
    /// covering segment, in position order.
    pub fn resolve(&self, position: u64) -> QueryResult {
        let mut hits = self.intervals.find(position, position + 1);
        let first = match hits.next() {
            Some(interval) => interval,
            None => return QueryResult::Missing,
        };
        match hits.next() {
            None => QueryResult::Value(self.values[first.val]),
            Some(second) => {
                let mut covering = vec![self.covering(first), self.covering(second)];
                covering.extend(hits.map(|interval| self.covering(interval)));
                QueryResult::Ambiguous(covering)
            }
        }
    }

    fn covering(&self, interval: &Interval<u64, usize>) -> Covering {
        Covering {
            start: interval.start,
            end: interval.stop - 1,
            value: self.values[interval.val],
        }
    }
}

/// Accumulates one (patient, chromosome) slot's intervals until the cohort is
/// fully consumed; the sorted query structure is built exactly once.
#[derive(Default)]
struct SlotBuilder {
    intervals: Vec<Interval<u64, usize>>,
    values: Vec<f64>,
}

impl SlotBuilder {
    fn insert(&mut self, start: u64, end: u64, value: f64) {
        self.intervals.push(Interval {
            start,
            stop: end + 1,
            val: self.values.len(),
        });
        self.values.push(value);
    }

    fn finish(self) -> ChromosomeIndex {
        ChromosomeIndex {
            intervals: Lapper::new(self.intervals),
            values: self.values,
        }
    }
}

/// One patient's 24 chromosome slots. A slot stays `None` until the first
/// segment for that chromosome arrives, so patients with sparse coverage pay
/// nothing for the chromosomes they lack.
pub struct PatientData {
    slots: [Option<ChromosomeIndex>; CHROMOSOME_SLOTS],
}

impl PatientData {
    pub fn chromosome(&self, chromosome: u8) -> Option<&ChromosomeIndex> {
        self.slots.get(chromosome as usize).and_then(Option::as_ref)
    }
}

/// All patient indexes for one cohort file. Built once, then queried
/// read-only for every (gene, patient) pair.
pub struct CohortIndex {
    patients: AHashMap<String, PatientData>,
}

impl CohortIndex {
    pub fn build(segments: Vec<Segment>) -> Self {
        let mut building: AHashMap<String, [Option<SlotBuilder>; CHROMOSOME_SLOTS]> =
            AHashMap::new();
        for Segment {
            patient_id,
            chromosome,
            start,
            end,
            value,
        } in segments
        {
            let slots = building
                .entry(patient_id)
                .or_insert_with(|| std::array::from_fn(|_| None));
            slots[chromosome as usize]
                .get_or_insert_with(SlotBuilder::default)
                .insert(start, end, value);
        }

        let patients = building
            .into_iter()
            .map(|(patient_id, slots)| {
                (
                    patient_id,
                    PatientData {
                        slots: slots.map(|slot| slot.map(SlotBuilder::finish)),
                    },
                )
            })
            .collect();
        Self { patients }
    }

    pub fn num_patients(&self) -> usize {
        self.patients.len()
    }

    /// Patient identifiers in lexicographic order: the cohort's fixed output
    /// column order.
    pub fn sorted_patient_ids(&self) -> Vec<&str> {
        self.patients
            .keys()
            .map(String::as_str)
            .sorted_unstable()
            .collect()
    }

    /// Point query for one (patient, chromosome, position). A patient or
    /// chromosome never observed in the cohort's segment data is `Missing`,
    /// not an error.
    pub fn resolve(&self, patient_id: &str, chromosome: u8, position: u64) -> QueryResult {
        match self
            .patients
            .get(patient_id)
            .and_then(|patient| patient.chromosome(chromosome))
        {
            Some(index) => index.resolve(position),
            None => QueryResult::Missing,
        }
    }
}
