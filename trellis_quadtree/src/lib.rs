// Copyright 2025 the Trellis Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

// After you edit the crate's doc comment, run this command, then check README.md for any missing links
// cargo rdme --workspace-project=trellis_quadtree --heading-base-level=0

//! Trellis Quadtree: a bounded, bucketed spatial index for 2D bounds.
//!
//! A quadtree partitions a rectangle into four quadrants, recursively, and
//! stores each entry in the deepest bucket that fully contains its bounds.
//! Buckets have a capacity (10 by default); an insert that would exceed it
//! splits the bucket into four and sinks the entries that fit entirely
//! inside one quadrant, while straddling entries stay put.
//!
//! The index is keyed by any small copyable id and can carry a payload per
//! entry (a rendering handle, cached geometry, whatever the view needs).
//!
//! ```
//! use kurbo::Rect;
//! use trellis_quadtree::Quadtree;
//!
//! let mut qtree: Quadtree<u32> = Quadtree::new(Rect::new(0.0, 0.0, 100.0, 100.0));
//! qtree.add(1, Rect::new(20.0, 10.0, 30.0, 20.0), ());
//! qtree.add(2, Rect::new(60.0, 60.0, 70.0, 80.0), ());
//!
//! assert_eq!(qtree.find_inside(Rect::new(0.0, 0.0, 50.0, 50.0)), vec![1]);
//! assert_eq!(qtree.find_intersect(Rect::new(65.0, 65.0, 66.0, 66.0)), vec![2]);
//! ```
//!
//! Entries are not required to lie inside the declared bounds; anything
//! that fits no quadrant lives at the root, and [`Quadtree::soft_bounds`]
//! reports the union of everything stored, which may exceed the declared
//! bounds.

use core::hash::Hash;
use core::mem;

use hashbrown::HashMap;
use kurbo::Rect;

/// Default number of entries a bucket holds before it splits.
const DEFAULT_CAPACITY: usize = 10;

/// A bounded quadtree over items keyed by `K` with per-item data `D`.
///
/// Rectangle queries are edge-inclusive: bounds that merely touch the
/// query rectangle count as intersecting.
pub struct Quadtree<K, D = ()>
where
    K: Copy + Eq + Hash,
{
    bucket: Bucket<K>,
    items: HashMap<K, (Rect, D)>,
    capacity: usize,
}

impl<K, D> core::fmt::Debug for Quadtree<K, D>
where
    K: Copy + Eq + Hash,
{
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Quadtree")
            .field("bounds", &self.bucket.bounds)
            .field("items", &self.items.len())
            .field("capacity", &self.capacity)
            .finish_non_exhaustive()
    }
}

impl<K, D> Quadtree<K, D>
where
    K: Copy + Eq + Hash,
{
    /// Create a quadtree covering `bounds` with the default bucket
    /// capacity.
    pub fn new(bounds: Rect) -> Self {
        Self::with_capacity(bounds, DEFAULT_CAPACITY)
    }

    /// Create a quadtree covering `bounds`, splitting buckets that would
    /// exceed `capacity` entries.
    pub fn with_capacity(bounds: Rect, capacity: usize) -> Self {
        Self {
            bucket: Bucket::new(bounds),
            items: HashMap::new(),
            capacity,
        }
    }

    /// The declared bounds of the tree.
    pub fn bounds(&self) -> Rect {
        self.bucket.bounds
    }

    /// The union of all stored bounds; `None` when empty.
    ///
    /// May exceed [`Quadtree::bounds`] when entries were added outside the
    /// declared area.
    pub fn soft_bounds(&self) -> Option<Rect> {
        let mut iter = self.items.values().map(|(bounds, _)| *bounds);
        let first = iter.next()?;
        Some(iter.fold(first, |acc, b| acc.union(b)))
    }

    /// Number of stored items.
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Whether the tree is empty.
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Whether `item` is stored.
    pub fn contains(&self, item: &K) -> bool {
        self.items.contains_key(item)
    }

    /// Add an item, or update its bounds and data when already present.
    ///
    /// An updated item is moved to the bucket its new bounds belong in.
    pub fn add(&mut self, item: K, bounds: Rect, data: D) {
        if let Some((old_bounds, _)) = self.items.get(&item) {
            self.bucket.remove(item, *old_bounds);
        }
        self.items.insert(item, (bounds, data));
        self.bucket.add(item, bounds, self.capacity);
    }

    /// Remove an item, returning its bounds and data.
    pub fn remove(&mut self, item: K) -> Option<(Rect, D)> {
        let (bounds, data) = self.items.remove(&item)?;
        self.bucket.remove(item, bounds);
        Some((bounds, data))
    }

    /// The stored bounds of an item.
    pub fn get_bounds(&self, item: &K) -> Option<Rect> {
        self.items.get(item).map(|(bounds, _)| *bounds)
    }

    /// The stored data of an item.
    pub fn get_data(&self, item: &K) -> Option<&D> {
        self.items.get(item).map(|(_, data)| data)
    }

    /// Mutable access to an item's data.
    pub fn get_data_mut(&mut self, item: &K) -> Option<&mut D> {
        self.items.get_mut(item).map(|(_, data)| data)
    }

    /// All items whose bounds lie entirely inside `rect`.
    pub fn find_inside(&self, rect: Rect) -> Vec<K> {
        let mut out = Vec::new();
        self.bucket.find(rect, true, &mut out);
        out
    }

    /// All items whose bounds intersect `rect` (edges included).
    pub fn find_intersect(&self, rect: Rect) -> Vec<K> {
        let mut out = Vec::new();
        self.bucket.find(rect, false, &mut out);
        out
    }

    /// Change the declared bounds and rebuild the bucket structure from
    /// the stored item bounds.
    pub fn resize(&mut self, bounds: Rect) {
        self.bucket = Bucket::new(bounds);
        // Re-add from the snapshot; the data side table stays as-is.
        let entries: Vec<(K, Rect)> = self
            .items
            .iter()
            .map(|(&item, &(bounds, _))| (item, bounds))
            .collect();
        for (item, bounds) in entries {
            self.bucket.add(item, bounds, self.capacity);
        }
    }

    /// Drop every item and sub-bucket, keeping the declared bounds.
    pub fn clear(&mut self) {
        self.items.clear();
        self.bucket = Bucket::new(self.bucket.bounds);
    }

    /// Bounds of every bucket, depth first. Diagnostic.
    pub fn bucket_bounds(&self) -> Vec<Rect> {
        let mut out = Vec::new();
        self.bucket.dump(&mut out);
        out
    }
}

/// One node of the quadtree.
#[derive(Debug)]
struct Bucket<K> {
    bounds: Rect,
    items: Vec<(K, Rect)>,
    children: Option<Box<[Bucket<K>; 4]>>,
}

impl<K: Copy + Eq> Bucket<K> {
    fn new(bounds: Rect) -> Self {
        Self {
            bounds,
            items: Vec::new(),
            children: None,
        }
    }

    fn add(&mut self, item: K, bounds: Rect, capacity: usize) {
        if self.children.is_none() && self.items.len() >= capacity && self.can_split() {
            self.split(capacity);
        }
        if let Some(children) = self.children.as_mut() {
            for child in children.iter_mut() {
                if rect_contains(child.bounds, bounds) {
                    return child.add(item, bounds, capacity);
                }
            }
        }
        self.items.push((item, bounds));
    }

    fn remove(&mut self, item: K, bounds: Rect) -> bool {
        if let Some(pos) = self.items.iter().position(|(i, _)| *i == item) {
            self.items.remove(pos);
            return true;
        }
        if let Some(children) = self.children.as_mut() {
            for child in children.iter_mut() {
                if rect_contains(child.bounds, bounds) {
                    return child.remove(item, bounds);
                }
            }
        }
        false
    }

    /// Splitting a degenerate bucket would recurse without making
    /// progress.
    fn can_split(&self) -> bool {
        self.bounds.width() > 0.0 && self.bounds.height() > 0.0
    }

    fn split(&mut self, capacity: usize) {
        let Rect { x0, y0, x1, y1 } = self.bounds;
        let cx = x0 + (x1 - x0) / 2.0;
        let cy = y0 + (y1 - y0) / 2.0;
        self.children = Some(Box::new([
            Self::new(Rect::new(x0, y0, cx, cy)),
            Self::new(Rect::new(cx, y0, x1, cy)),
            Self::new(Rect::new(x0, cy, cx, y1)),
            Self::new(Rect::new(cx, cy, x1, y1)),
        ]));
        let items = mem::take(&mut self.items);
        for (item, bounds) in items {
            self.add(item, bounds, capacity);
        }
    }

    fn find(&self, rect: Rect, fully_inside: bool, out: &mut Vec<K>) {
        for &(item, bounds) in &self.items {
            let keep = if fully_inside {
                rect_contains(rect, bounds)
            } else {
                rect_intersects(rect, bounds)
            };
            if keep {
                out.push(item);
            }
        }
        if let Some(children) = self.children.as_ref() {
            for child in children.iter() {
                if rect_intersects(child.bounds, rect) {
                    child.find(rect, fully_inside, out);
                }
            }
        }
    }

    fn dump(&self, out: &mut Vec<Rect>) {
        out.push(self.bounds);
        if let Some(children) = self.children.as_ref() {
            for child in children.iter() {
                child.dump(out);
            }
        }
    }
}

/// Whether `outer` fully contains `inner`, edges included.
fn rect_contains(outer: Rect, inner: Rect) -> bool {
    outer.x0 <= inner.x0 && outer.y0 <= inner.y0 && outer.x1 >= inner.x1 && outer.y1 >= inner.y1
}

/// Whether two rectangles overlap; shared edges count as intersecting.
fn rect_intersects(a: Rect, b: Rect) -> bool {
    a.x0 <= b.x1 && b.x0 <= a.x1 && a.y0 <= b.y1 && b.y0 <= a.y1
}

#[cfg(test)]
mod tests {
    use super::*;

    fn unit_items(n: usize) -> Vec<(usize, Rect)> {
        (0..n)
            .map(|i| {
                let p = i as f64 * 0.06;
                (i, Rect::new(p, p, p + 0.01, p + 0.01))
            })
            .collect()
    }

    #[test]
    fn add_and_query() {
        let mut qtree: Quadtree<&str> = Quadtree::new(Rect::new(0.0, 0.0, 100.0, 100.0));
        qtree.add("a", Rect::new(20.0, 10.0, 30.0, 20.0), ());
        assert_eq!(qtree.len(), 1);
        assert!(qtree.contains(&"a"));
        assert_eq!(
            qtree.get_bounds(&"a"),
            Some(Rect::new(20.0, 10.0, 30.0, 20.0))
        );
        assert_eq!(qtree.find_inside(Rect::new(0.0, 0.0, 100.0, 100.0)), vec!["a"]);
    }

    #[test]
    fn update_moves_item_to_new_bucket() {
        let mut qtree: Quadtree<u32> = Quadtree::with_capacity(Rect::new(0.0, 0.0, 100.0, 100.0), 2);
        // Force a split so quadrant buckets exist.
        qtree.add(1, Rect::new(1.0, 1.0, 2.0, 2.0), ());
        qtree.add(2, Rect::new(60.0, 1.0, 61.0, 2.0), ());
        qtree.add(3, Rect::new(1.0, 60.0, 2.0, 61.0), ());

        qtree.add(1, Rect::new(70.0, 70.0, 80.0, 80.0), ());
        assert_eq!(qtree.len(), 3);
        assert_eq!(
            qtree.find_inside(Rect::new(50.0, 50.0, 100.0, 100.0)),
            vec![1]
        );
        // The old location no longer matches.
        assert!(!qtree.find_intersect(Rect::new(0.0, 0.0, 10.0, 10.0)).contains(&1));
    }

    #[test]
    fn eleventh_item_splits_the_bucket() {
        let mut qtree: Quadtree<usize> = Quadtree::new(Rect::new(0.0, 0.0, 100.0, 100.0));
        for i in 0..10 {
            let x = (i as f64) * 4.0;
            qtree.add(i, Rect::new(x, 0.0, x + 1.0, 1.0), ());
        }
        assert!(qtree.bucket.children.is_none(), "capacity not yet exceeded");
        qtree.add(10, Rect::new(60.0, 60.0, 61.0, 61.0), ());
        assert!(qtree.bucket.children.is_some(), "11th add must split");
    }

    #[test]
    fn straddling_items_stay_at_the_parent() {
        let mut qtree: Quadtree<usize> = Quadtree::with_capacity(Rect::new(0.0, 0.0, 100.0, 100.0), 2);
        qtree.add(0, Rect::new(1.0, 1.0, 2.0, 2.0), ());
        qtree.add(1, Rect::new(60.0, 1.0, 61.0, 2.0), ());
        // Crosses the vertical midline; can never sink into a quadrant.
        qtree.add(2, Rect::new(40.0, 40.0, 60.0, 45.0), ());
        assert_eq!(qtree.bucket.items.len(), 1);
        assert_eq!(qtree.bucket.items[0].0, 2);
    }

    #[test]
    fn crowded_quadrant_cascades_splits() {
        let mut qtree: Quadtree<usize> = Quadtree::new(Rect::new(0.0, 0.0, 100.0, 100.0));
        for (i, bounds) in unit_items(15) {
            qtree.add(i, bounds, ());
        }
        assert_eq!(qtree.len(), 15);
        let root = &qtree.bucket;
        assert!(root.children.is_some(), "root must have split");
        assert!(
            root.items.is_empty(),
            "everything fits inside the NW quadrant"
        );
        // All 15 items are still reachable.
        let found = qtree.find_inside(Rect::new(0.0, 0.0, 100.0, 100.0));
        assert_eq!(found.len(), 15);
    }

    #[test]
    fn find_inside_versus_intersect() {
        let mut qtree: Quadtree<&str> = Quadtree::new(Rect::new(0.0, 0.0, 100.0, 100.0));
        qtree.add("inside", Rect::new(10.0, 10.0, 20.0, 20.0), ());
        qtree.add("straddles", Rect::new(45.0, 10.0, 55.0, 20.0), ());
        qtree.add("outside", Rect::new(80.0, 80.0, 90.0, 90.0), ());

        let query = Rect::new(0.0, 0.0, 50.0, 50.0);
        assert_eq!(qtree.find_inside(query), vec!["inside"]);
        let mut hits = qtree.find_intersect(query);
        hits.sort_unstable();
        assert_eq!(hits, vec!["inside", "straddles"]);
    }

    #[test]
    fn shared_edges_intersect() {
        let mut qtree: Quadtree<&str> = Quadtree::new(Rect::new(0.0, 0.0, 100.0, 100.0));
        qtree.add("edge", Rect::new(50.0, 0.0, 60.0, 10.0), ());
        assert_eq!(
            qtree.find_intersect(Rect::new(40.0, 0.0, 50.0, 10.0)),
            vec!["edge"]
        );
    }

    #[test]
    fn remove_returns_bounds_and_data() {
        let mut qtree: Quadtree<u32, &str> = Quadtree::new(Rect::new(0.0, 0.0, 100.0, 100.0));
        qtree.add(7, Rect::new(5.0, 5.0, 6.0, 6.0), "payload");
        assert_eq!(qtree.get_data(&7), Some(&"payload"));
        let removed = qtree.remove(7);
        assert_eq!(removed, Some((Rect::new(5.0, 5.0, 6.0, 6.0), "payload")));
        assert!(qtree.is_empty());
        assert!(qtree.remove(7).is_none());
    }

    #[test]
    fn soft_bounds_is_union_and_may_exceed_bounds() {
        let mut qtree: Quadtree<u32> = Quadtree::new(Rect::new(0.0, 0.0, 100.0, 100.0));
        assert!(qtree.soft_bounds().is_none());
        qtree.add(1, Rect::new(10.0, 10.0, 20.0, 20.0), ());
        qtree.add(2, Rect::new(90.0, 90.0, 150.0, 120.0), ());
        assert_eq!(
            qtree.soft_bounds(),
            Some(Rect::new(10.0, 10.0, 150.0, 120.0))
        );
        // The out-of-bounds entry is still queryable (it lives at the root).
        assert_eq!(
            qtree.find_intersect(Rect::new(140.0, 110.0, 160.0, 130.0)),
            vec![2]
        );
    }

    #[test]
    fn resize_rebuilds_from_snapshot() {
        let mut qtree: Quadtree<usize> = Quadtree::with_capacity(Rect::new(0.0, 0.0, 100.0, 100.0), 3);
        for i in 0..8 {
            let x = (i % 4) as f64 * 20.0;
            let y = (i / 4) as f64 * 60.0;
            qtree.add(i, Rect::new(x, y, x + 5.0, y + 5.0), ());
        }
        qtree.resize(Rect::new(-50.0, -50.0, 200.0, 200.0));
        assert_eq!(qtree.bounds(), Rect::new(-50.0, -50.0, 200.0, 200.0));
        assert_eq!(qtree.len(), 8);
        let found = qtree.find_inside(Rect::new(-50.0, -50.0, 200.0, 200.0));
        assert_eq!(found.len(), 8);
    }

    #[test]
    fn clear_keeps_declared_bounds() {
        let mut qtree: Quadtree<u32> = Quadtree::new(Rect::new(0.0, 0.0, 64.0, 64.0));
        for i in 0..20 {
            let p = i as f64;
            qtree.add(i, Rect::new(p, p, p + 0.5, p + 0.5), ());
        }
        qtree.clear();
        assert!(qtree.is_empty());
        assert_eq!(qtree.bounds(), Rect::new(0.0, 0.0, 64.0, 64.0));
        assert_eq!(qtree.bucket_bounds().len(), 1);
    }

    #[test]
    fn item_lives_in_exactly_one_bucket() {
        let mut qtree: Quadtree<usize> = Quadtree::with_capacity(Rect::new(0.0, 0.0, 100.0, 100.0), 2);
        for (i, bounds) in unit_items(9) {
            qtree.add(i, bounds, ());
        }
        // Count occurrences over all buckets.
        fn count<K: Copy + Eq>(bucket: &Bucket<K>, key: K) -> usize {
            let mut n = bucket.items.iter().filter(|(i, _)| *i == key).count();
            if let Some(children) = bucket.children.as_ref() {
                for child in children.iter() {
                    n += count(child, key);
                }
            }
            n
        }
        for i in 0..9 {
            assert_eq!(count(&qtree.bucket, i), 1, "item {i} duplicated or lost");
        }
    }
}
