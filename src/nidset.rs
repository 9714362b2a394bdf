//! Identifier bitsets and per-assemblage candidate maps.
//!
//! A [`NidSet`] is the currency passed between clauses. Nids are signed, so
//! they are stored in a roaring bitmap through an order-preserving bias: the
//! sign bit is flipped, which maps `i32::MIN..=i32::MAX` monotonically onto
//! `0..=u32::MAX`. Iteration is therefore always in ascending nid order.

use std::collections::HashMap;
use std::fmt;

// used for internal result sets
use roaring::RoaringBitmap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::datatype::{Nid, NidHasher};

const SIGN_FLIP: u32 = 0x8000_0000;

#[inline]
fn encode(nid: Nid) -> u32 {
    (nid as u32) ^ SIGN_FLIP
}

#[inline]
fn decode(bits: u32) -> Nid {
    (bits ^ SIGN_FLIP) as Nid
}

#[derive(Clone, Default, PartialEq, Eq)]
pub struct NidSet {
    bits: RoaringBitmap,
}

impl NidSet {
    pub fn new() -> Self {
        Self {
            bits: RoaringBitmap::new(),
        }
    }
    pub fn of(nids: &[Nid]) -> Self {
        nids.iter().copied().collect()
    }
    /// Returns true if the nid was not already a member.
    pub fn add(&mut self, nid: Nid) -> bool {
        self.bits.insert(encode(nid))
    }
    /// Removing an absent nid is a no-op.
    pub fn remove(&mut self, nid: Nid) -> bool {
        self.bits.remove(encode(nid))
    }
    pub fn contains(&self, nid: Nid) -> bool {
        self.bits.contains(encode(nid))
    }
    pub fn len(&self) -> usize {
        self.bits.len() as usize
    }
    pub fn is_empty(&self) -> bool {
        self.bits.is_empty()
    }
    pub fn clear(&mut self) {
        self.bits.clear();
    }
    pub fn min(&self) -> Option<Nid> {
        self.bits.min().map(decode)
    }
    pub fn max(&self) -> Option<Nid> {
        self.bits.max().map(decode)
    }
    pub fn union_with(&mut self, other: &NidSet) {
        self.bits |= &other.bits;
    }
    pub fn intersect_with(&mut self, other: &NidSet) {
        self.bits &= &other.bits;
    }
    pub fn difference_with(&mut self, other: &NidSet) {
        self.bits -= &other.bits;
    }
    pub fn symmetric_difference_with(&mut self, other: &NidSet) {
        self.bits ^= &other.bits;
    }
    pub fn union(&self, other: &NidSet) -> NidSet {
        NidSet {
            bits: &self.bits | &other.bits,
        }
    }
    pub fn intersection(&self, other: &NidSet) -> NidSet {
        NidSet {
            bits: &self.bits & &other.bits,
        }
    }
    pub fn difference(&self, other: &NidSet) -> NidSet {
        NidSet {
            bits: &self.bits - &other.bits,
        }
    }
    pub fn is_subset(&self, other: &NidSet) -> bool {
        self.bits.is_subset(&other.bits)
    }
    pub fn iter(&self) -> impl Iterator<Item = Nid> + '_ {
        self.bits.iter().map(decode)
    }
    /// Snapshot of the members in ascending order. Iterate this copy when the
    /// set itself may be mutated during the walk.
    pub fn to_vec(&self) -> Vec<Nid> {
        self.iter().collect()
    }
    /// Keeps only the members for which `keep` returns true.
    pub fn retain<F: FnMut(Nid) -> bool>(&mut self, mut keep: F) {
        for nid in self.to_vec() {
            if !keep(nid) {
                self.remove(nid);
            }
        }
    }
}

impl FromIterator<Nid> for NidSet {
    fn from_iter<I: IntoIterator<Item = Nid>>(iter: I) -> Self {
        let mut set = NidSet::new();
        for nid in iter {
            set.add(nid);
        }
        set
    }
}

impl Extend<Nid> for NidSet {
    fn extend<I: IntoIterator<Item = Nid>>(&mut self, iter: I) {
        for nid in iter {
            self.add(nid);
        }
    }
}

impl fmt::Debug for NidSet {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_set().entries(self.iter()).finish()
    }
}

impl fmt::Display for NidSet {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let members: Vec<String> = self.iter().map(|n| n.to_string()).collect();
        write!(f, "{{{}}}", members.join(", "))
    }
}

impl Serialize for NidSet {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_seq(self.iter())
    }
}

impl<'de> Deserialize<'de> for NidSet {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let nids = Vec::<Nid>::deserialize(deserializer)?;
        Ok(nids.into_iter().collect())
    }
}

// ------------- Per-assemblage results -------------
/// Candidate sets keyed by the nid of the assemblage they were drawn from.
#[derive(Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AssemblageResults {
    map: HashMap<Nid, NidSet, NidHasher>,
}

impl AssemblageResults {
    pub fn new() -> Self {
        Self {
            map: HashMap::default(),
        }
    }
    pub fn with(mut self, assemblage: Nid, candidates: NidSet) -> Self {
        self.insert(assemblage, candidates);
        self
    }
    pub fn insert(&mut self, assemblage: Nid, candidates: NidSet) -> Option<NidSet> {
        self.map.insert(assemblage, candidates)
    }
    pub fn get(&self, assemblage: Nid) -> Option<&NidSet> {
        self.map.get(&assemblage)
    }
    pub fn contains_assemblage(&self, assemblage: Nid) -> bool {
        self.map.contains_key(&assemblage)
    }
    /// Assemblage keys in ascending order.
    pub fn assemblages(&self) -> Vec<Nid> {
        let mut keys: Vec<Nid> = self.map.keys().copied().collect();
        keys.sort_unstable();
        keys
    }
    pub fn len(&self) -> usize {
        self.map.len()
    }
    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }
    /// Total number of candidates across every assemblage.
    pub fn candidate_count(&self) -> usize {
        self.map.values().map(NidSet::len).sum()
    }
    /// Union of every assemblage's candidates.
    pub fn all_candidates(&self) -> NidSet {
        let mut all = NidSet::new();
        for set in self.map.values() {
            all.union_with(set);
        }
        all
    }
}

impl fmt::Debug for AssemblageResults {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let mut map = f.debug_map();
        for assemblage in self.assemblages() {
            map.entry(&assemblage, &self.map[&assemblage]);
        }
        map.finish()
    }
}
