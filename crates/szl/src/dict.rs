//! The dictionary algorithm.
//!
//! A dict is physically an even-length list of key-value pairs. Lookup sorts
//! the pairs by key hash on first use (marking the value `SORTED`), then
//! binary-searches by hash. Hash collisions are admitted: every candidate
//! found by hash is confirmed by comparing key bytes before it counts as a
//! hit. Keys become read-only once inserted so the sort order cannot rot
//! underneath the flag.

use crate::error::SzlResult;
use crate::heap::{Heap, ObjId};
use crate::value::{ObjFlags, RepBits};

impl Heap {
    /// Sorts the pair array by key hash if it is not already sorted.
    ///
    /// Reordering changes the canonical string form, so a sort that actually
    /// runs drops every representation other than the list itself before
    /// setting `SORTED`.
    fn dict_sort(&mut self, dict: ObjId, items: &mut Vec<ObjId>) -> SzlResult<()> {
        if self.get(dict).flags.contains(ObjFlags::SORTED) {
            return Ok(());
        }
        let mut pairs: Vec<(u32, ObjId, ObjId)> = Vec::with_capacity(items.len() / 2);
        for pair in items.chunks_exact(2) {
            pairs.push((self.hash_of(pair[0])?, pair[0], pair[1]));
        }
        pairs.sort_by_key(|&(hash, _, _)| hash);
        items.clear();
        for (_, k, v) in pairs {
            items.push(k);
            items.push(v);
        }
        self.invalidate_except(dict, RepBits::LIST);
        let obj = self.get_mut(dict);
        // Same ids in a new order; reference counts carry over unchanged.
        *obj.items_mut() = items.clone();
        obj.flags |= ObjFlags::SORTED;
        Ok(())
    }

    /// Finds the pair index of `key`, or `None` when absent.
    fn dict_find(&mut self, dict: ObjId, key: ObjId) -> SzlResult<Option<usize>> {
        let mut items = self.as_dict_vec(dict)?;
        let hash = self.hash_of(key)?;
        if items.is_empty() {
            return Ok(None);
        }
        self.dict_sort(dict, &mut items)?;

        let npairs = items.len() / 2;
        let mut lo = 0usize;
        let mut hi = npairs;
        while lo < hi {
            let mid = (lo + hi) / 2;
            if self.hash_of(items[mid * 2])? < hash {
                lo = mid + 1;
            } else {
                hi = mid;
            }
        }
        // Scan the run of equal-hash pairs, confirming by string equality.
        let mut i = lo;
        while i < npairs && self.hash_of(items[i * 2])? == hash {
            if self.eq_values(items[i * 2], key)? {
                return Ok(Some(i));
            }
            i += 1;
        }
        Ok(None)
    }

    /// Looks up `key`; returns the value id (borrowed) or `None`.
    pub fn dict_get(&mut self, dict: ObjId, key: ObjId) -> SzlResult<Option<ObjId>> {
        match self.dict_find(dict, key)? {
            Some(pair) => {
                let items = self.get(dict).list_rep();
                Ok(Some(items[pair * 2 + 1]))
            }
            None => Ok(None),
        }
    }

    /// Inserts or overwrites `key` with `value`; the key becomes read-only.
    pub fn dict_set(&mut self, dict: ObjId, key: ObjId, value: ObjId) -> SzlResult<()> {
        match self.dict_find(dict, key)? {
            Some(pair) => {
                self.list_set(dict, (pair * 2 + 1) as i64, value)?;
            }
            None => {
                self.list_append(dict, key)?;
                self.list_append(dict, value)?;
            }
        }
        self.set_ro(key);
        Ok(())
    }

    /// Builds a dict from alternating key-value ids, deduplicating keys
    /// through the insert path. The pair references are borrowed.
    pub fn new_dict(&mut self, pairs: &[ObjId]) -> SzlResult<ObjId> {
        let dict = self.new_list(Vec::new());
        for pair in pairs.chunks_exact(2) {
            if let Err(err) = self.dict_set(dict, pair[0], pair[1]) {
                self.dec_ref(dict);
                return Err(err);
            }
        }
        Ok(dict)
    }

    /// Shallow-copies a dict: a fresh list holding new references to the same
    /// pairs. The sort flag carries over so the copy needs no re-sort.
    pub fn dict_copy(&mut self, dict: ObjId) -> SzlResult<ObjId> {
        let items = self.as_dict_vec(dict)?;
        let sorted = self.get(dict).flags.contains(ObjFlags::SORTED);
        for &item in &items {
            self.inc_ref(item);
        }
        let copy = self.new_list(items);
        if sorted {
            self.get_mut(copy).flags |= ObjFlags::SORTED;
        }
        Ok(copy)
    }
}
